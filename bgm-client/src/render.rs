//! Terminal rendering of `UiState`

use crate::ui_state::UiState;

const BAR_WIDTH: usize = 30;

/// One status line for the terminal
pub fn render_line(state: &UiState) -> String {
    match state {
        UiState::Idle => "Ready to create your BGM video.".to_string(),
        UiState::Completed { artifact } => {
            format!("Done! Download your BGM video: {}", artifact.download_url)
        }
        UiState::Failed { message } => format!("Error: {}", message),
        UiState::Submitting { .. } | UiState::Polling { .. } => {
            let percent = state.progress().unwrap_or(0);
            format!(
                "[{}] {:>3}% {}",
                progress_bar(percent, BAR_WIDTH),
                percent,
                state.phase_label().unwrap_or_default()
            )
        }
    }
}

/// Line to print when a run ends in `message`, unless the state line already shows it
pub fn failure_line(state: &UiState, message: &str) -> Option<String> {
    match state {
        UiState::Failed { .. } => None,
        _ => Some(format!("Error: {}", message)),
    }
}

fn progress_bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui_state::ArtifactRef;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10), "----------");
        assert_eq!(progress_bar(55, 10), "#####-----");
        assert_eq!(progress_bar(100, 10), "##########");
    }

    #[test]
    fn test_render_polling() {
        let line = render_line(&UiState::Polling {
            job_id: "j".to_string(),
            progress: 55,
        });
        assert!(line.ends_with(" 55% Looping and mixing audio..."), "{}", line);
    }

    #[test]
    fn test_render_submitting() {
        let line = render_line(&UiState::Submitting { upload_percent: 7 });
        assert!(line.ends_with("  7% Uploading..."), "{}", line);
    }

    #[test]
    fn test_render_terminal_states() {
        let done = UiState::Completed {
            artifact: ArtifactRef {
                file_id: "xyz".to_string(),
                download_url: "http://svc/api/download/xyz".to_string(),
            },
        };
        assert_eq!(
            render_line(&done),
            "Done! Download your BGM video: http://svc/api/download/xyz"
        );
        assert_eq!(render_line(&UiState::failed("Nope")), "Error: Nope");
    }

    #[test]
    fn test_failure_printed_once() {
        // Failed states are already rendered as "Error: ..."
        let failed = UiState::failed("Error processing your request. Please try again.");
        assert_eq!(
            failure_line(&failed, "Error processing your request. Please try again."),
            None
        );

        // Errors that never reach the state (e.g. validation) still get a line
        assert_eq!(
            failure_line(&UiState::Idle, "No audio file selected"),
            Some("Error: No audio file selected".to_string())
        );
    }
}
