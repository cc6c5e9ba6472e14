//! Inline button tokens
//!
//! Every inline keyboard button carries one of these tokens as callback data.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token could not be understood
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CallbackParseError {
    /// Token is not one the bot ever issues
    #[error("unknown callback token: {0}")]
    Unknown(String),
    /// Token has a known prefix but an invalid argument
    #[error("invalid argument in callback token: {0}")]
    InvalidArgument(String),
}

/// Action requested by an inline button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// `like_ad:<id>`
    Like(u64),
    /// `delete_ad:<id>`
    Delete(u64),
    /// `page:<n>`
    Page(usize),
    /// `confirm_text_ad`
    ConfirmText,
    /// `cancel_text_ad`
    CancelText,
    /// `add_photo_description`
    AddPhotoDescription,
    /// `save_photo_no_desc`
    SavePhotoNoDescription,
    /// `main_menu`
    MainMenu,
    /// `current_page`
    CurrentPage,
    /// `help`
    Help,
    /// `create_ad`
    CreateAd,
    /// `list_ads`
    ListAds,
}

const LIKE_PREFIX: &str = "like_ad";
const DELETE_PREFIX: &str = "delete_ad";
const PAGE_PREFIX: &str = "page";

impl CallbackAction {
    /// Menu actions abandon any submission in progress
    #[must_use]
    pub const fn resets_flow(self) -> bool {
        matches!(
            self,
            Self::MainMenu | Self::Help | Self::CreateAd | Self::ListAds
        )
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like(id) => write!(f, "{LIKE_PREFIX}:{id}"),
            Self::Delete(id) => write!(f, "{DELETE_PREFIX}:{id}"),
            Self::Page(page) => write!(f, "{PAGE_PREFIX}:{page}"),
            Self::ConfirmText => f.write_str("confirm_text_ad"),
            Self::CancelText => f.write_str("cancel_text_ad"),
            Self::AddPhotoDescription => f.write_str("add_photo_description"),
            Self::SavePhotoNoDescription => f.write_str("save_photo_no_desc"),
            Self::MainMenu => f.write_str("main_menu"),
            Self::CurrentPage => f.write_str("current_page"),
            Self::Help => f.write_str("help"),
            Self::CreateAd => f.write_str("create_ad"),
            Self::ListAds => f.write_str("list_ads"),
        }
    }
}

fn parse_arg<T: FromStr>(token: &str, arg: &str) -> Result<T, CallbackParseError> {
    arg.parse()
        .map_err(|_| CallbackParseError::InvalidArgument(token.to_string()))
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Some((prefix, arg)) = token.split_once(':') {
            return match prefix {
                LIKE_PREFIX => parse_arg(token, arg).map(Self::Like),
                DELETE_PREFIX => parse_arg(token, arg).map(Self::Delete),
                PAGE_PREFIX => parse_arg(token, arg).map(Self::Page),
                _ => Err(CallbackParseError::Unknown(token.to_string())),
            };
        }

        match token {
            "confirm_text_ad" => Ok(Self::ConfirmText),
            "cancel_text_ad" => Ok(Self::CancelText),
            "add_photo_description" => Ok(Self::AddPhotoDescription),
            "save_photo_no_desc" => Ok(Self::SavePhotoNoDescription),
            "main_menu" => Ok(Self::MainMenu),
            "current_page" => Ok(Self::CurrentPage),
            "help" => Ok(Self::Help),
            "create_ad" => Ok(Self::CreateAd),
            "list_ads" => Ok(Self::ListAds),
            _ => Err(CallbackParseError::Unknown(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_known_tokens() {
        assert_eq!("like_ad:12".parse(), Ok(CallbackAction::Like(12)));
        assert_eq!("delete_ad:3".parse(), Ok(CallbackAction::Delete(3)));
        assert_eq!("page:2".parse(), Ok(CallbackAction::Page(2)));
        assert_eq!("save_photo_no_desc".parse(), Ok(CallbackAction::SavePhotoNoDescription));
        assert_eq!("current_page".parse(), Ok(CallbackAction::CurrentPage));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            "like_ad:abc".parse::<CallbackAction>(),
            Err(CallbackParseError::InvalidArgument("like_ad:abc".into()))
        );
        assert_eq!(
            "page:-1".parse::<CallbackAction>(),
            Err(CallbackParseError::InvalidArgument("page:-1".into()))
        );
        assert_eq!(
            "retry_no_loop".parse::<CallbackAction>(),
            Err(CallbackParseError::Unknown("retry_no_loop".into()))
        );
        assert!("share_ad:1".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_menu_actions_reset_flow() {
        assert!(CallbackAction::MainMenu.resets_flow());
        assert!(CallbackAction::ListAds.resets_flow());
        assert!(!CallbackAction::ConfirmText.resets_flow());
        assert!(!CallbackAction::Page(2).resets_flow());
    }

    proptest! {
        #[test]
        fn id_tokens_round_trip(id in any::<u64>(), page in any::<usize>()) {
            for action in [CallbackAction::Like(id), CallbackAction::Delete(id), CallbackAction::Page(page)] {
                prop_assert_eq!(action.to_string().parse::<CallbackAction>(), Ok(action));
            }
        }
    }
}
