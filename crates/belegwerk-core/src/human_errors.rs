// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for the capture screen.
//
// Every technical error is mapped to plain English with a clear suggestion.
// A detection miss is not an error but still gets a notice, so the user knows
// the photo was kept uncropped.

use crate::error::BelegwerkError;

/// Severity of a message from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing went wrong; the user is told what happened.
    Informational,
    /// Trying the same thing again is likely to work.
    Transient,
    /// User must do something (grant permission, plug in a camera).
    ActionRequired,
    /// Cannot be fixed by retrying or user action.
    Permanent,
}

/// A human-readable message with plain English text and an actionable
/// suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying from the review screen can help.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Notice shown when no document edges were found and the raw photo is
/// offered for review instead.
pub fn detection_notice() -> HumanError {
    HumanError {
        message: "We couldn't find the edges of the document.".into(),
        suggestion: "The whole photo was kept. Retake it on a darker, plain surface if you want it cropped automatically.".into(),
        retriable: true,
        severity: Severity::Informational,
    }
}

/// Convert a `BelegwerkError` into a `HumanError` anyone can understand.
pub fn humanize_error(err: &BelegwerkError) -> HumanError {
    match err {
        // -- Camera errors --
        BelegwerkError::CameraUnavailable(detail) => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("denied") || lower.contains("permission") {
                HumanError {
                    message: "The app isn't allowed to use the camera.".into(),
                    suggestion: "Allow camera access for this app in your device settings, then open the scanner again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "No camera could be found.".into(),
                    suggestion: "Make sure a camera is connected and not being used by another app.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        BelegwerkError::SessionInactive => HumanError {
            message: "The camera stopped unexpectedly.".into(),
            suggestion: "Close the scanner and open it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Imaging errors --
        BelegwerkError::EncodingFailed(_) => HumanError {
            message: "The photo couldn't be saved.".into(),
            suggestion: "Tap confirm to try again, or retake the photo.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BelegwerkError::InvalidConfig(detail) => HumanError {
            message: "The scanner settings are not valid.".into(),
            suggestion: format!("Reset the scanner settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        BelegwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or pick a different location.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        BelegwerkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Platform --
        BelegwerkError::Bridge(_) => HumanError {
            message: "A device-specific feature didn't work.".into(),
            suggestion: "Try restarting the app. Some features may not be available on all devices.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_action_required() {
        let err = BelegwerkError::CameraUnavailable("NotAllowedError: permission denied".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("allowed"));
        assert!(!human.retriable);
    }

    #[test]
    fn missing_device_mentions_camera() {
        let err = BelegwerkError::CameraUnavailable("no video input device".into());
        let human = humanize_error(&err);
        assert!(human.message.contains("camera"));
    }

    #[test]
    fn encoding_failure_is_retriable() {
        let human = humanize_error(&BelegwerkError::EncodingFailed("buffer".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn detection_miss_is_informational() {
        let notice = detection_notice();
        assert_eq!(notice.severity, Severity::Informational);
        assert!(notice.retriable);
    }
}
