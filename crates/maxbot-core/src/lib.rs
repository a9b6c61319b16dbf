//! Core types for the maxbot framework.
//!
//! This crate holds everything the other layers agree on:
//!
//! - [`model`]: the [`Update`] envelope and the platform objects it carries
//! - [`client`]: the [`PlatformClient`] seam used to fetch updates and call the API
//! - [`error`]: decode, transport and API error types

pub mod client;
pub mod error;
pub mod model;

pub use client::{
    ApiMethod, ApiRequest, DEFAULT_LIMIT, DEFAULT_POLL_TIMEOUT, PlatformClient, UpdatesRequest,
};
pub use error::{
    ApiError, ApiResult, DecodeError, DecodeResult, TransportError, TransportResult,
};
pub use model::{
    Attachment, AttachmentKind, AttachmentPayload, BotCommand, CallbackQuery, ChatType,
    ContactPayload, LinkType, LinkedMessage, LocationPayload, MarkupElement, MarkupType,
    MediaPayload, Message, MessageBody, MessageStat, PhotoPayload, Recipient, SharePayload,
    StickerPayload, Update, UpdateType, UpdatesResponse, User,
};
