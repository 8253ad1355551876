//! Shared UI icons and emojis.
//!
//! This module provides common emoji constants used across the UI
//! for consistent visual styling.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Step indicators
pub static HAMMER: Emoji<'_, '_> = Emoji("🔨 ", "[BUILD]");
pub static FLASK: Emoji<'_, '_> = Emoji("🧪 ", "[TEST]");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "[FOUND]");
pub static BROOM: Emoji<'_, '_> = Emoji("🧹 ", "[RESET]");
