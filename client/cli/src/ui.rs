use indicatif::{ProgressBar, ProgressStyle};
use picshelf_core::actions::{ButtonRole, Dialog, SheetButton};
use picshelf_core::{Notice, NoticeLevel, Notifier};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Prints notices the way the app shows toasts.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.message.is_empty() {
            return;
        }
        match notice.level {
            NoticeLevel::Success => println!("✓ {}", notice.message),
            NoticeLevel::Failure => eprintln!("✗ {}", notice.message),
        }
    }
}

/// Show a spinner while `fut` runs.
pub async fn with_spinner<T>(message: &str, fut: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let out = fut.await;
    spinner.finish_and_clear();
    out
}

pub fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

/// One trimmed line of input. End of input is an error, not an empty answer.
fn read_answer(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}

/// Render a list of buttons and read the choice from stdin.
pub fn choose<T: Clone>(
    header: &str,
    message: Option<&str>,
    buttons: &[SheetButton<T>],
) -> anyhow::Result<T> {
    println!("{}", header);
    if let Some(message) = message {
        println!("{}", message);
    }
    for (i, button) in buttons.iter().enumerate() {
        println!("  {}) {}", i + 1, button.label);
    }
    choose_from(&mut io::stdin().lock(), buttons)
}

fn choose_from<T: Clone>(
    input: &mut impl BufRead,
    buttons: &[SheetButton<T>],
) -> anyhow::Result<T> {
    loop {
        print!("choice: ");
        io::stdout().flush()?;
        let answer = read_answer(input)?;
        match pick(buttons, &answer) {
            Some(action) => return Ok(action),
            None => println!("pick 1-{}", buttons.len()),
        }
    }
}

pub fn confirm<T: Clone>(dialog: &Dialog<T>) -> anyhow::Result<T> {
    choose(dialog.header, Some(dialog.message), &dialog.buttons)
}

/// A 1-based index picks that button; empty input picks the cancel button.
fn pick<T: Clone>(buttons: &[SheetButton<T>], input: &str) -> Option<T> {
    if input.is_empty() {
        return buttons
            .iter()
            .find(|b| b.role == ButtonRole::Cancel)
            .map(|b| b.action.clone());
    }
    let index: usize = input.parse().ok()?;
    buttons.get(index.checked_sub(1)?).map(|b| b.action.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use picshelf_core::actions::{
        delete_confirmation, image_source_actions, ConfirmAction, Platform, SourceAction,
    };
    use picshelf_core::Image;
    use std::io::Cursor;

    fn image() -> Image {
        Image {
            id: 1,
            file_name: "a.png".into(),
            file_path: "/img/1.png".into(),
        }
    }

    #[test]
    fn test_pick_by_index() {
        let buttons = image_source_actions(Platform::Desktop);
        assert_eq!(pick(&buttons, "1"), Some(SourceAction::Camera));
        assert_eq!(pick(&buttons, "3"), Some(SourceAction::File));
        assert_eq!(pick(&buttons, "0"), None);
        assert_eq!(pick(&buttons, "4"), None);
        assert_eq!(pick(&buttons, "x"), None);
    }

    #[test]
    fn test_empty_input_cancels_dialog() {
        let dialog = delete_confirmation(&image());
        assert_eq!(pick(&dialog.buttons, ""), Some(ConfirmAction::Cancel));
        assert_eq!(pick(&dialog.buttons, "2"), Some(ConfirmAction::Delete(image())));
    }

    #[test]
    fn test_empty_input_without_cancel_button() {
        let buttons = image_source_actions(Platform::Hybrid);
        assert_eq!(pick(&buttons, ""), None);
    }

    #[test]
    fn test_choose_retries_until_valid() {
        let buttons = image_source_actions(Platform::Desktop);
        let mut input = Cursor::new("9\n\nx\n 3 \n");
        assert_eq!(choose_from(&mut input, &buttons).unwrap(), SourceAction::File);
    }

    #[test]
    fn test_choose_stops_at_end_of_input() {
        let buttons = image_source_actions(Platform::Desktop);
        let mut input = Cursor::new("9\n");
        assert!(choose_from(&mut input, &buttons).is_err());

        let mut empty = Cursor::new("");
        assert!(choose_from(&mut empty, &buttons).is_err());
    }

    #[test]
    fn test_read_answer_trims_and_detects_eof() {
        let mut input = Cursor::new("  photo.png \r\n");
        assert_eq!(read_answer(&mut input).unwrap(), "photo.png");
        assert!(read_answer(&mut input).is_err());
    }
}
