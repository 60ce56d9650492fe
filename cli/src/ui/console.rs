// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Terminal output, used instead of std's `print*!()` macros.
//!
//! The `c_*` macros ignore write errors instead of panicking, so piping
//! output through `head` (closing our stdout early) terminates the
//! command quietly rather than with a broken-pipe panic. Output also
//! goes through a redirectable [`Console`], which the watch loop points
//! at an in-memory buffer to repaint the screen atomically.

use std::fmt::{Display, Formatter, Write};
use std::sync::{Arc, Mutex, OnceLock};

use dialoguer::console::Style as DStyle;

use super::stylesheet::{colors_enabled, Style};
use crate::cli_env::CliEnv;

static GLOBAL_STDOUT_CONSOLE: OnceLock<Console> = OnceLock::new();
static GLOBAL_STDERR_CONSOLE: OnceLock<Console> = OnceLock::new();

pub fn set_stdout(out: Console) {
    let _ = GLOBAL_STDOUT_CONSOLE.set(out);
}

pub fn set_stderr(err: Console) {
    let _ = GLOBAL_STDERR_CONSOLE.set(err);
}

pub fn stdout() -> Console {
    GLOBAL_STDOUT_CONSOLE.get_or_init(Console::stdout).clone()
}

pub fn stderr() -> Console {
    GLOBAL_STDERR_CONSOLE.get_or_init(Console::stderr).clone()
}

#[derive(Debug, Clone)]
pub struct Console {
    inner: Arc<Sink>,
}

#[derive(Debug)]
enum Sink {
    Stdout,
    Stderr,
    Memory(Mutex<String>),
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            inner: Arc::new(Sink::Stdout),
        }
    }

    pub fn stderr() -> Self {
        Self {
            inner: Arc::new(Sink::Stderr),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Sink::Memory(Mutex::new(String::new()))),
        }
    }

    pub fn take_buffer(&self) -> Option<String> {
        if let Sink::Memory(ref buffer) = *self.inner {
            Some(std::mem::take(&mut buffer.lock().unwrap()))
        } else {
            None
        }
    }
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        use std::io::Write;
        match *self.inner {
            Sink::Stdout => std::io::stdout()
                .write_all(s.as_bytes())
                .map_err(|_| std::fmt::Error),
            Sink::Stderr => std::io::stderr()
                .write_all(s.as_bytes())
                .map_err(|_| std::fmt::Error),
            Sink::Memory(ref buffer) => {
                let mut guard = buffer.lock().unwrap();
                write!(guard, "{s}")
            }
        }
    }
}

/// Emoji that falls back to a plain string if colors are disabled.
#[derive(Copy, Clone)]
pub struct Icon<'a, 'b>(pub &'a str, pub &'b str);

/// Text with a style that drops the style if colors are disabled.
#[derive(Copy, Clone)]
pub struct Styled<T: ?Sized>(pub Style, pub T);

impl Display for Icon<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if colors_enabled() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{}", self.1)
        }
    }
}

impl<T> Display for Styled<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if colors_enabled() {
            let dstyle = DStyle::from(self.0);
            write!(f, "{}", dstyle.apply_to(&self.1))
        } else {
            write!(f, "{}", self.1)
        }
    }
}

pub fn confirm_or_exit(env: &CliEnv, prompt: &str) -> anyhow::Result<()> {
    if !confirm(env, prompt) {
        return Err(anyhow::anyhow!("User aborted"));
    }
    Ok(())
}

pub fn confirm(env: &CliEnv, prompt: &str) -> bool {
    let theme = dialoguer::theme::ColorfulTheme::default();
    if env.auto_confirm() {
        crate::c_println!(
            "{} {}",
            prompt,
            Styled(Style::Warn, "Auto-confirming --yes is set."),
        );
        true
    } else {
        dialoguer::Confirm::with_theme(&theme)
            .with_prompt(prompt)
            .default(false)
            .wait_for_newline(true)
            .interact_opt()
            .unwrap_or(Some(false))
            .unwrap_or(false)
    }
}

#[macro_export]
/// Internal macro used by the c_*print*! macros
macro_rules! _cecho {
    (@empty_line, $where:tt) => {
        {
            use std::fmt::Write;
            let mut _lock = $crate::ui::console::$where();
            let _ = writeln!(_lock);
        }
    };
    (@newline, $where:tt, $($arg:tt)*) => {
        {
            use std::fmt::Write;
            let mut _lock = $crate::ui::console::$where();
            let _ = writeln!(_lock, $($arg)*);
        }
    };
    (@bare, $where:tt, $($arg:tt)*) => {
        {
            use std::fmt::Write;
            let mut _lock = $crate::ui::console::$where();
            let _ = write!(_lock, $($arg)*);
        }
    };
    (@nl_with_prefix, ($prefix:expr), $where:tt, $($arg:tt)*) => {
        {
            use std::fmt::Write;
            let mut _lock = $crate::ui::console::$where();
            let _ = write!(_lock, "{} ", $prefix);
            let _ = writeln!(_lock, $($arg)*);
        }
    };
    (@title, ($icon:expr), $where:tt, $($arg:tt)*) => {
        {
            use std::fmt::Write;
            let mut _lock = $crate::ui::console::$where();
            let _icon = $crate::ui::console::Icon($icon, "");
            let _message = format!("{_icon} {}:", $($arg)*);
            let _ = writeln!(_lock);
            let _ = writeln!(_lock, "{_message}");
            let _ = writeln!(_lock, "{:-<1$}", "", _message.chars().count());
        }
    };
}

#[macro_export]
macro_rules! c_println {
    () => {
        $crate::_cecho!(@empty_line, stdout)
    };
    ($($arg:tt)*) => {
        $crate::_cecho!(@newline, stdout, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_print {
    ($($arg:tt)*) => {
        $crate::_cecho!(@bare, stdout, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_eprintln {
    () => {
        $crate::_cecho!(@empty_line, stderr)
    };
    ($($arg:tt)*) => {
        $crate::_cecho!(@newline, stderr, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_success {
    ($($arg:tt)*) => {
        $crate::_cecho!(@nl_with_prefix, ($crate::ui::stylesheet::SUCCESS_ICON), stdout, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_error {
    ($($arg:tt)*) => {
        $crate::_cecho!(@nl_with_prefix, ($crate::ui::stylesheet::ERR_ICON), stderr, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_warn {
    ($($arg:tt)*) => {
        $crate::_cecho!(@nl_with_prefix, ($crate::ui::stylesheet::WARN_ICON), stderr, $($arg)*)
    };
}

#[macro_export]
macro_rules! c_title {
    ($icon:expr, $($arg:tt)*) => {
        $crate::_cecho!(@title, ($icon), stdout, $($arg)*)
    };
}
