//! Core types for tool-augmented completions
//!
//! This module contains the wire types shared by the backends and drivers.

mod arguments;
mod embedding;
mod message;
mod response;
mod tool;

pub use arguments::{ArgumentError, ToolArguments};
pub use embedding::{Embedding, EmbeddingResponse};
pub use message::{
    ChatChoice, ChatCompletion, ChatMessage, ChatToolCall, ContentPart, FunctionCall, ImageUrl,
    MessageContent, MessageRole,
};
pub use response::{
    FunctionCallItem, FunctionCallOutputItem, InputMessage, MessageItem, Response, ResponseContent,
    ResponseInput, ResponseItem, TypedItem,
};
pub use tool::{ToolCallRequest, ToolCallResult, ToolOutput, ToolSchema, ToolStyle};
