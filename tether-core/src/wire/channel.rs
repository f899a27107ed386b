// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Framed request/response messages for the provisioning channel.
//!
//! Every frame is either a request (verb + path + body) or a response
//! acknowledging a request by id.

/// A single channel frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelFrame {
    #[prost(enumeration = "FrameType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub request: Option<ChannelRequest>,
    #[prost(message, optional, tag = "3")]
    pub response: Option<ChannelResponse>,
}

/// An inbound or outbound framed request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelRequest {
    #[prost(string, optional, tag = "1")]
    pub verb: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub path: Option<String>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub body: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "4")]
    pub id: Option<u64>,
}

/// Acknowledgement of a handled request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelResponse {
    #[prost(uint64, optional, tag = "1")]
    pub id: Option<u64>,
    #[prost(uint32, optional, tag = "2")]
    pub status: Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub message: Option<String>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub body: Option<Vec<u8>>,
}

impl ChannelFrame {
    /// Wraps a request in a frame.
    pub fn request(request: ChannelRequest) -> Self {
        ChannelFrame {
            r#type: Some(FrameType::Request as i32),
            request: Some(request),
            response: None,
        }
    }

    /// Wraps a response in a frame.
    pub fn response(response: ChannelResponse) -> Self {
        ChannelFrame {
            r#type: Some(FrameType::Response as i32),
            request: None,
            response: Some(response),
        }
    }
}

/// Discriminates the two frame payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum FrameType {
    Unknown = 0,
    Request = 1,
    Response = 2,
}
