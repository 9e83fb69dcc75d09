//! Data models for Memo

mod memo;

pub use memo::{memo_fields, Memo, MemoId, FIELD_BODY_TEXT, FIELD_TAGS, FIELD_UPDATED_AT};
