// LogLens - GPL-3.0-or-later
// This file is part of LogLens.
//
// Copyright (C) 2025 LogLens contributors
//
// LogLens is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogLens is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogLens.  If not, see <https://www.gnu.org/licenses/>.

//! File ingestion: batch reading and live tailing.
//!
//! The tailer runs on a background thread and reports over an `mpsc`
//! channel. Recognizers only ever see complete lines; a trailing partial
//! line is held back until its newline arrives.

use std::fs::File;
use std::io::{BufRead, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;

use crate::parser::{LogRecord, Recognize};

/// Read a whole file into records with 1-based line numbers.
///
/// Content is converted lossily, so a stray non-UTF-8 byte cannot abort
/// the load.
pub fn read_file(path: &std::path::Path, recognizer: &dyn Recognize) -> anyhow::Result<Vec<LogRecord>> {
    let mut buffer = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut buffer))
        .with_context(|| format!("cannot read {}", path.display()))?;
    let text = String::from_utf8_lossy(&buffer);
    Ok(parse_lines(text.lines(), 1, recognizer))
}

/// Read a finite line source (a pipe, stdin) into records.
pub fn read_lines<R: BufRead>(reader: R, recognizer: &dyn Recognize) -> Vec<LogRecord> {
    let lines: Vec<String> = reader
        .lines()
        .map_while(Result::ok)
        .collect();
    parse_lines(lines.iter().map(String::as_str), 1, recognizer)
}

fn parse_lines<'a, I>(lines: I, first_number: usize, recognizer: &dyn Recognize) -> Vec<LogRecord>
where
    I: Iterator<Item = &'a str>,
{
    lines
        .enumerate()
        .map(|(i, raw)| recognizer.parse_line(first_number + i, raw))
        .collect()
}

/// What the tailer thread reports.
pub enum TailMessage {
    Records(Vec<LogRecord>),
    /// The file shrank; reading restarted from the top with numbering
    /// reset to 1.
    Truncated,
}

/// Live follower of a growing file.
///
/// Pausing buffers messages on the tailer thread and flushes them in
/// order on resume; nothing is dropped. Dropping the handle cancels the
/// thread.
pub struct Tailer {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Tailer {
    pub fn spawn(
        path: PathBuf,
        recognizer: Box<dyn Recognize>,
        poll_interval: Duration,
    ) -> (Tailer, Receiver<TailMessage>) {
        let (tx, rx) = channel();
        let paused = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = {
            let paused = Arc::clone(&paused);
            let cancelled = Arc::clone(&cancelled);
            thread::spawn(move || {
                tail_loop(&path, recognizer.as_ref(), &tx, &paused, &cancelled, poll_interval);
            })
        };
        (
            Tailer {
                paused,
                cancelled,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn set_paused(&self, on: bool) {
        self.paused.store(on, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Drop for Tailer {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn tail_loop(
    path: &std::path::Path,
    recognizer: &dyn Recognize,
    tx: &Sender<TailMessage>,
    paused: &AtomicBool,
    cancelled: &AtomicBool,
    poll_interval: Duration,
) {
    let mut offset: u64 = 0;
    let mut next_line_number: usize = 1;
    // Bytes of a line whose newline has not arrived yet
    let mut partial: Vec<u8> = Vec::new();
    // Messages held back while paused
    let mut pending: Vec<TailMessage> = Vec::new();

    log::debug!("tailing {}", path.display());

    while !cancelled.load(Ordering::Relaxed) {
        match poll_once(path, &mut offset, &mut next_line_number, &mut partial, recognizer) {
            Ok(messages) => {
                pending.extend(messages);
                if !paused.load(Ordering::Relaxed) && !pending.is_empty() {
                    for message in pending.drain(..) {
                        if tx.send(message).is_err() {
                            // Receiver gone, stop quietly
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                // Transient (file mid-rotation, briefly missing): retry
                log::warn!("tail read error on {}: {e}", path.display());
            }
        }
        thread::sleep(poll_interval);
    }
    log::debug!("tail of {} cancelled", path.display());
}

fn poll_once(
    path: &std::path::Path,
    offset: &mut u64,
    next_line_number: &mut usize,
    partial: &mut Vec<u8>,
    recognizer: &dyn Recognize,
) -> anyhow::Result<Vec<TailMessage>> {
    let mut messages = Vec::new();
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    if len < *offset {
        log::info!("{} truncated, restarting from the top", path.display());
        *offset = 0;
        *next_line_number = 1;
        partial.clear();
        messages.push(TailMessage::Truncated);
    }
    if len == *offset {
        return Ok(messages);
    }

    file.seek(SeekFrom::Start(*offset))?;
    let mut buffer = Vec::with_capacity((len - *offset) as usize);
    file.take(len - *offset).read_to_end(&mut buffer)?;
    *offset += buffer.len() as u64;
    partial.extend_from_slice(&buffer);

    // Hand out only complete lines; keep the tail fragment for later
    let Some(last_newline) = partial.iter().rposition(|&b| b == b'\n') else {
        return Ok(messages);
    };
    let complete: Vec<u8> = partial.drain(..=last_newline).collect();
    let text = String::from_utf8_lossy(&complete);
    let records = parse_lines(
        text.lines(),
        *next_line_number,
        recognizer,
    );
    *next_line_number += records.len();
    if !records.is_empty() {
        messages.push(TailMessage::Records(records));
    }
    Ok(messages)
}
