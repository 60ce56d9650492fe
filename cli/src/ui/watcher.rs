// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use cling::Collect;
use crossterm::style::ResetColor;
use crossterm::terminal::{
    BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};

use super::console::{Console, Icon};

#[derive(clap::Args, Clone, Collect, Debug)]
pub struct Watch {
    /// Watch mode. Continuously refreshing the output.
    #[clap(short)]
    watch: bool,
    /// Watch interval in seconds
    #[clap(short = 'n', default_value = "2.0")]
    interval: f32,
}

impl Watch {
    pub async fn run<F, O>(&self, mut what: F) -> Result<()>
    where
        F: FnMut() -> O,
        O: Future<Output = Result<()>>,
    {
        if !self.watch {
            return what().await;
        }

        // Redirect console output to an in-memory buffer so each round
        // repaints the screen in one go instead of scrolling.
        let console = Console::in_memory();
        super::console::set_stdout(console.clone());
        super::console::set_stderr(console);

        queue!(
            std::io::stdout(),
            cursor::Hide,
            EnterAlternateScreen,
            Clear(ClearType::All),
            ResetColor
        )?;

        let mut interval = tokio::time::interval(Duration::from_secs_f32(self.interval));
        loop {
            interval.tick().await;
            match what().await {
                Ok(_) => repaint(self.interval)?,
                Err(e) => {
                    restore_terminal();
                    return Err(e);
                }
            }
        }
    }
}

fn restore_terminal() {
    use std::io::Write;
    let mut stdout = std::io::stdout();
    let _ = execute!(stdout, cursor::Show, LeaveAlternateScreen, ResetColor);
    // Print whatever the failed round buffered so the error has context.
    if let Some(buffered) = super::console::stdout().take_buffer() {
        let _ = write!(stdout, "{buffered}");
    }
}

fn repaint(interval: f32) -> Result<()> {
    use std::io::Write;
    let (_, rows) = crossterm::terminal::size()?;
    let mut lock = std::io::stdout().lock();
    queue!(lock, cursor::MoveTo(0, 0), BeginSynchronizedUpdate)?;
    queue!(lock, Clear(ClearType::CurrentLine))?;
    let _ = writeln!(lock, "{} Refreshing every {}s.", Icon("👀", ""), interval);

    if let Some(buffered) = super::console::stdout().take_buffer() {
        for (i, line) in buffered.lines().enumerate() {
            if i as u16 >= rows.saturating_sub(3) {
                let _ = writeln!(lock, "(output truncated to fit screen)");
                queue!(lock, Clear(ClearType::UntilNewLine))?;
                break;
            }
            let _ = writeln!(lock, "{line}");
            queue!(lock, Clear(ClearType::UntilNewLine))?;
        }
    }

    queue!(lock, Clear(ClearType::FromCursorDown), EndSynchronizedUpdate)?;
    let _ = lock.flush();
    Ok(())
}
