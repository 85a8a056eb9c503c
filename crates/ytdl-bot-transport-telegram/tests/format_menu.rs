//! The format menu and the core catalog must agree on callback data

use teloxide::types::InlineKeyboardButtonKind;
use ytdl_bot_core::download::DownloadError;
use ytdl_bot_core::formats::{FormatCatalog, FormatKey};
use ytdl_bot_transport_telegram::bot::views::{
    format_keyboard, DefaultDownloadView, DownloadView,
};

#[test]
fn every_menu_button_resolves_to_its_own_format() {
    let catalog = FormatCatalog::default();
    let buttons: Vec<(String, String)> = format_keyboard()
        .inline_keyboard
        .into_iter()
        .flatten()
        .filter_map(|b| match b.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some((b.text, data)),
            _ => None,
        })
        .collect();

    assert_eq!(buttons.len(), FormatKey::ALL.len());
    for (label, data) in buttons {
        let policy = catalog.policy_for_callback(&data);
        assert_eq!(policy.key.label(), label, "button {data} maps to wrong format");
    }
}

#[test]
fn every_error_has_a_user_facing_text() {
    let errors = [
        DownloadError::InvalidLink,
        DownloadError::NoPendingRequest,
        DownloadError::ExtractionFailed("ERROR: Video unavailable".into()),
        DownloadError::TooLarge(73.24),
        DownloadError::Unexpected("disk full".into()),
    ];

    for error in &errors {
        let text = DefaultDownloadView::error_message(error);
        assert!(!text.is_empty());
        assert!(text.starts_with('⚠') || text.starts_with('❌'), "{text}");
    }

    assert!(DefaultDownloadView::error_message(&errors[3]).contains("73.2MB"));
    assert!(DefaultDownloadView::error_message(&errors[2]).contains("Video unavailable"));
}
