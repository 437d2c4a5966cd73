// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-oriented review screen: capture, show what was found, and ask the user
// to confirm, retry, or cancel.

use std::io::{BufRead, Write};

use belegwerk_capture::{CaptureWorkflow, StateKind};
use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::human_errors::humanize_error;
use tracing::debug;

/// A reply at the review prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Confirm,
    Retry,
    Cancel,
}

/// Parse one line of user input. Empty input confirms.
pub fn parse_choice(line: &str) -> Option<Choice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "c" | "confirm" | "y" | "yes" => Some(Choice::Confirm),
        "r" | "retry" | "retake" => Some(Choice::Retry),
        "q" | "quit" | "x" | "cancel" | "n" | "no" => Some(Choice::Cancel),
        _ => None,
    }
}

/// Run the capture/review loop until the workflow is emitted or cancelled.
///
/// The workflow must already be previewing. End of input cancels. With
/// `auto_confirm` the first result is accepted without prompting.
pub fn review_loop<R: BufRead, W: Write>(
    workflow: &mut CaptureWorkflow,
    mut input: R,
    mut out: W,
    auto_confirm: bool,
) -> Result<()> {
    writeln!(out, "{}", workflow.title())?;

    while !workflow.state().is_terminal() {
        if workflow.state() == StateKind::Previewing {
            workflow.capture()?;
            describe_result(workflow, &mut out)?;
        }

        let choice = if auto_confirm {
            Choice::Confirm
        } else {
            prompt(&mut input, &mut out)?
        };
        debug!(?choice, "Review choice");

        match choice {
            Choice::Confirm => match workflow.confirm() {
                Ok(_) => {}
                Err(err @ BelegwerkError::EncodingFailed(_)) => {
                    let human = humanize_error(&err);
                    writeln!(out, "{} {}", human.message, human.suggestion)?;
                    if auto_confirm {
                        workflow.cancel();
                    }
                }
                Err(err) => return Err(err),
            },
            Choice::Retry => {
                workflow.retry();
            }
            Choice::Cancel => {
                workflow.cancel();
            }
        }
    }

    Ok(())
}

fn describe_result<W: Write>(workflow: &CaptureWorkflow, out: &mut W) -> Result<()> {
    let Some(result) = workflow.result() else {
        return Ok(());
    };
    let raster = result.raster();
    if result.is_detected() {
        writeln!(
            out,
            "Document found and straightened ({}x{}).",
            raster.width(),
            raster.height()
        )?;
    } else if let Some(notice) = workflow.notice() {
        writeln!(out, "{} {}", notice.message, notice.suggestion)?;
    }
    Ok(())
}

/// Ask until a valid choice is given. End of input means cancel.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Choice> {
    loop {
        write!(out, "[c]onfirm, [r]etry, [q]uit > ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Choice::Cancel);
        }
        match parse_choice(&line) {
            Some(choice) => return Ok(choice),
            None => writeln!(out, "Please answer c, r, or q.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use belegwerk_bridge::SyntheticCamera;
    use belegwerk_bridge::synthetic::{blank_frame, centred_document_frame};
    use belegwerk_capture::CaptureStateMachine;
    use belegwerk_core::{Blob, CaptureConfig};

    fn run(camera: SyntheticCamera, input: &str, auto: bool) -> (Option<Blob>, bool, String) {
        let delivered = Rc::new(RefCell::new(None));
        let cancelled = Rc::new(RefCell::new(false));
        let machine = CaptureStateMachine::new(Box::new(camera), &CaptureConfig::default());
        let mut workflow = CaptureWorkflow::new(
            "Test scan",
            machine,
            {
                let delivered = Rc::clone(&delivered);
                move |blob| *delivered.borrow_mut() = Some(blob)
            },
            {
                let cancelled = Rc::clone(&cancelled);
                move || *cancelled.borrow_mut() = true
            },
        );
        workflow.start().expect("open");

        let mut out = Vec::new();
        review_loop(&mut workflow, Cursor::new(input.as_bytes()), &mut out, auto)
            .expect("review loop");
        drop(workflow);

        let blob = delivered.borrow_mut().take();
        let was_cancelled = *cancelled.borrow();
        (blob, was_cancelled, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn parses_choices() {
        assert_eq!(parse_choice("\n"), Some(Choice::Confirm));
        assert_eq!(parse_choice(" R \n"), Some(Choice::Retry));
        assert_eq!(parse_choice("quit"), Some(Choice::Cancel));
        assert_eq!(parse_choice("maybe"), None);
    }

    #[test]
    fn confirm_delivers_document() {
        let camera = SyntheticCamera::new(centred_document_frame(320, 240, 0.6));
        let (blob, cancelled, out) = run(camera, "c\n", false);
        assert!(blob.expect("delivered").rectified);
        assert!(!cancelled);
        assert!(out.contains("Document found"));
    }

    #[test]
    fn retry_then_confirm_delivers_once() {
        let camera = SyntheticCamera::new(blank_frame(160, 120));
        let (blob, cancelled, out) = run(camera, "what\nr\n\n", false);
        assert!(!blob.expect("delivered").rectified);
        assert!(!cancelled);
        assert!(out.contains("Please answer"));
        assert_eq!(out.matches("couldn't find the edges").count(), 2);
    }

    #[test]
    fn end_of_input_cancels() {
        let camera = SyntheticCamera::new(blank_frame(32, 32));
        let (blob, cancelled, _) = run(camera, "", false);
        assert!(blob.is_none());
        assert!(cancelled);
    }

    #[test]
    fn auto_confirm_skips_prompt() {
        let camera = SyntheticCamera::new(centred_document_frame(320, 240, 0.6));
        let (blob, _, out) = run(camera, "", true);
        assert!(blob.is_some());
        assert!(!out.contains("[c]onfirm"));
    }
}
