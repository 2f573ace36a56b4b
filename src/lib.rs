// ============================================
// src/lib.rs
// ピンイン表の組み立て・表示と練習ゲームの中身
// ============================================

pub mod arabic;
pub mod builder;
pub mod config;
pub mod context;
pub mod draft;
pub mod error;
pub mod markup;
pub mod overrides;
pub mod practice;
pub mod sampler;
pub mod save_data;
pub mod store;
pub mod syllable;
pub mod table;
pub mod tone_pairs;
pub mod viewer;

pub use error::{Error, Result};
pub use syllable::{Family, Final, Initial};
pub use table::{Side, Slot, Tone};
