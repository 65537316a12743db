// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the corner-editing UI and the CLI.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::FlatscanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing is wrong with the input; the run was interrupted and can be repeated.
    Transient,
    /// User must do something (move a corner, pick a size, choose another file).
    ActionRequired,
    /// Cannot be fixed by retrying or adjusting corners.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether repeating the same request can succeed.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `FlatscanError` into a `HumanError`.
pub fn humanize_error(err: &FlatscanError) -> HumanError {
    match err {
        // -- Geometry errors --
        FlatscanError::DegenerateGeometry(_) => HumanError {
            message: "The corners don't outline a page.".into(),
            suggestion: "Some corners are on top of each other, in a straight line, or the outline crosses itself. Drag each corner onto a corner of the document.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::InvalidDimensions { width, height } if *width == 0 || *height == 0 => HumanError {
            message: "The output size is empty.".into(),
            suggestion: format!("Choose a width and height of at least one pixel. (Requested {width}x{height})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::InvalidDimensions { width, height } => HumanError {
            message: "The output size is too large.".into(),
            suggestion: format!("Choose a smaller width and height, at most 16384 pixels each. (Requested {width}x{height})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::InvalidCorners(detail) => HumanError {
            message: "We need exactly four corners.".into(),
            suggestion: format!("Mark the four corners of the page, starting top-left and going clockwise. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Cancelled => HumanError {
            message: "Flattening was stopped.".into(),
            suggestion: "Start it again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Image errors --
        FlatscanError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FlatscanError::DetectionFailed(_) => HumanError {
            message: "We couldn't find the edges of the page.".into(),
            suggestion: "Place the document on a plain, contrasting surface, or mark the four corners yourself.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Configuration / persistence --
        FlatscanError::Config(detail) => HumanError {
            message: "The settings file has a mistake in it.".into(),
            suggestion: format!("Fix the setting or delete the file to go back to defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Io(err) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check that the file exists and that you're allowed to write to the folder. ({err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Serialization(_) => HumanError {
            message: "A settings or corners file couldn't be understood.".into(),
            suggestion: "Make sure the file is valid JSON.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_geometry_needs_user_action() {
        let human = humanize_error(&FlatscanError::DegenerateGeometry("collinear".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn invalid_dimensions_mentions_requested_size() {
        let human = humanize_error(&FlatscanError::InvalidDimensions {
            width: 0,
            height: 300,
        });
        assert!(human.suggestion.contains("0x300"));
    }

    #[test]
    fn oversized_output_is_explained() {
        let human = humanize_error(&FlatscanError::InvalidDimensions {
            width: 40_000,
            height: 30_000,
        });
        assert!(human.message.contains("too large"));
        assert!(human.suggestion.contains("40000x30000"));
    }

    #[test]
    fn cancelled_is_retriable() {
        let human = humanize_error(&FlatscanError::Cancelled);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn image_error_is_permanent() {
        let human = humanize_error(&FlatscanError::ImageError("truncated".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
