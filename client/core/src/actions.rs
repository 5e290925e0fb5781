//! Declarative descriptions of the prompts the gallery needs.
//!
//! The presentation layer decides how to draw these; the core only says
//! what the choices are and which operation each one leads to.

use crate::api::Image;

/// Where the gallery is running. File picking only makes sense outside a
/// native (hybrid) app shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Hybrid,
    Browser,
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAction {
    Camera,
    Photos,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Cancel,
    Delete(Image),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonRole {
    Default,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetButton<T> {
    pub label: &'static str,
    pub icon: Option<&'static str>,
    pub role: ButtonRole,
    pub action: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog<T> {
    pub header: &'static str,
    pub message: &'static str,
    pub buttons: Vec<SheetButton<T>>,
}

pub const SOURCE_SHEET_HEADER: &str = "Select Image Source";

pub fn image_source_actions(platform: Platform) -> Vec<SheetButton<SourceAction>> {
    let mut buttons = vec![
        SheetButton {
            label: "Take Photo",
            icon: Some("camera"),
            role: ButtonRole::Default,
            action: SourceAction::Camera,
        },
        SheetButton {
            label: "Choose From Photos",
            icon: Some("image"),
            role: ButtonRole::Default,
            action: SourceAction::Photos,
        },
    ];

    if platform != Platform::Hybrid {
        buttons.push(SheetButton {
            label: "Choose a File",
            icon: Some("attach"),
            role: ButtonRole::Default,
            action: SourceAction::File,
        });
    }
    buttons
}

pub fn delete_confirmation(image: &Image) -> Dialog<ConfirmAction> {
    Dialog {
        header: "Delete!",
        message: "Are you sure you want to delete this image?",
        buttons: vec![
            SheetButton {
                label: "Cancel",
                icon: None,
                role: ButtonRole::Cancel,
                action: ConfirmAction::Cancel,
            },
            SheetButton {
                label: "Okay",
                icon: None,
                role: ButtonRole::Default,
                action: ConfirmAction::Delete(image.clone()),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_has_no_file_option() {
        let actions: Vec<_> = image_source_actions(Platform::Hybrid)
            .into_iter()
            .map(|b| b.action)
            .collect();
        assert_eq!(actions, vec![SourceAction::Camera, SourceAction::Photos]);
    }

    #[test]
    fn test_browser_can_pick_files() {
        let buttons = image_source_actions(Platform::Browser);
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons[2].label, "Choose a File");
        assert_eq!(buttons[2].action, SourceAction::File);
    }

    #[test]
    fn test_delete_confirmation_targets_image() {
        let image = Image {
            id: 4,
            file_name: "a.png".into(),
            file_path: "/img/4.png".into(),
        };
        let dialog = delete_confirmation(&image);

        assert_eq!(dialog.header, "Delete!");
        assert_eq!(dialog.buttons[0].role, ButtonRole::Cancel);
        assert_eq!(dialog.buttons[0].action, ConfirmAction::Cancel);
        assert_eq!(dialog.buttons[1].action, ConfirmAction::Delete(image));
    }
}
