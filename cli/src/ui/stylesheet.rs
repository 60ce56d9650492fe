// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Icons, semantic styles, and table presets shared by all commands.

use std::sync::atomic::{AtomicBool, Ordering};

use comfy_table::Table;

use super::console::Icon;
use crate::app::{TableStyle, UiConfig};

pub const SUCCESS_ICON: Icon = Icon("✅", "[OK]:");
pub const ERR_ICON: Icon = Icon("❌", "[ERR]:");
pub const WARN_ICON: Icon = Icon("⚠️", "[WARNING]:");
pub const NETWORK_ICON: Icon = Icon("🌐", "");

static COLORS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set once at startup, read by [`super::console::Styled`] and
/// [`super::console::Icon`] from `Display` impls where no environment
/// can be threaded through.
pub fn set_colors_enabled(enabled: bool) {
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

/// Semantic text styles; the mapping to colors lives here so commands
/// never hardcode a color.
#[derive(Copy, Clone)]
pub enum Style {
    Danger,
    Warn,
    Success,
    Info,
    Notice,
    Normal,
}

impl From<Style> for dialoguer::console::Style {
    fn from(style: Style) -> Self {
        let base = dialoguer::console::Style::new();
        match style {
            Style::Danger => base.red().bold(),
            Style::Warn => base.magenta(),
            Style::Success => base.green(),
            Style::Info => base.bright().bold(),
            Style::Notice => base.italic(),
            Style::Normal => base,
        }
    }
}

/// Factory trait to create tables that respect the UI config.
pub trait StyledTable {
    fn new_styled(ui_config: &UiConfig) -> Self;
    fn set_styled_header<T: ToString>(&mut self, headers: Vec<T>) -> &mut Self;
}

impl StyledTable for Table {
    fn new_styled(ui_config: &UiConfig) -> Self {
        let mut table = Table::new();
        match ui_config.table_style {
            TableStyle::Compact => {
                table.load_preset(comfy_table::presets::NOTHING);
            }
            TableStyle::Borders => {
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            }
        }
        table.set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
        table
    }

    fn set_styled_header<T: ToString>(&mut self, headers: Vec<T>) -> &mut Self {
        self.set_header(
            headers
                .into_iter()
                .map(|header| {
                    comfy_table::Cell::new(header.to_string())
                        .add_attribute(comfy_table::Attribute::Bold)
                })
                .collect::<Vec<_>>(),
        )
    }
}
