//! Invite URL parsing and generation.

use url::Url;

use splitlist_core::{InviteToken, ListId};

use crate::config::LinkConfig;

/// A parsed invite target: the list and the credential to join it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    /// The list being shared.
    pub list_id: ListId,
    /// The presented invite token.
    pub token: InviteToken,
}

impl InviteLink {
    /// Parse an incoming deep link.
    ///
    /// Recognized transports for the same logical target:
    /// - `https://<host>/invite?...` and `http://<host>/invite?...` with
    ///   the configured host
    /// - `<scheme>://invite?...` with the configured custom scheme
    /// - `<scheme>://<anything>/invite?...` (broader app-scheme form)
    ///
    /// Both `listId` and `token` query parameters are required; a link
    /// missing either is malformed and rejected.
    #[must_use]
    pub fn parse(uri: &str, config: &LinkConfig) -> Option<Self> {
        let url = Url::parse(uri).ok()?;

        let recognized = match url.scheme() {
            "http" | "https" => {
                url.host_str() == Some(config.host.as_str()) && has_invite_segment(&url)
            }
            scheme if scheme == config.scheme => {
                url.host_str() == Some("invite") || has_invite_segment(&url)
            }
            _ => false,
        };
        if !recognized {
            return None;
        }

        let mut list_id = None;
        let mut token = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "listId" => list_id = Some(value.into_owned()),
                "token" => token = Some(value.into_owned()),
                _ => {}
            }
        }

        Some(Self {
            list_id: ListId::new(list_id?),
            token: InviteToken::new(token?),
        })
    }
}

fn has_invite_segment(url: &Url) -> bool {
    url.path_segments()
        .is_some_and(|mut segments| segments.any(|segment| segment == "invite"))
}

/// The https form of an invite link.
#[must_use]
pub fn https_url(config: &LinkConfig, list_id: &ListId, token: &InviteToken) -> String {
    format!(
        "https://{}/invite?listId={list_id}&token={}",
        config.host,
        token.as_str()
    )
}

/// The custom-scheme form of an invite link.
#[must_use]
pub fn custom_url(config: &LinkConfig, list_id: &ListId, token: &InviteToken) -> String {
    format!(
        "{}://invite?listId={list_id}&token={}",
        config.scheme,
        token.as_str()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> LinkConfig {
        LinkConfig::default()
    }

    #[test]
    fn test_parse_https_form() {
        let link = InviteLink::parse(
            "https://splitlist.app/invite?listId=l1&token=tok123",
            &config(),
        )
        .unwrap();
        assert_eq!(link.list_id, ListId::from("l1"));
        assert!(link.token.matches("tok123"));
    }

    #[test]
    fn test_parse_http_form() {
        assert!(
            InviteLink::parse(
                "http://splitlist.app/invite?listId=l1&token=tok123",
                &config()
            )
            .is_some()
        );
    }

    #[test]
    fn test_parse_custom_scheme_host_form() {
        let link =
            InviteLink::parse("splitlist://invite?listId=l1&token=tok123", &config()).unwrap();
        assert_eq!(link.list_id, ListId::from("l1"));
    }

    #[test]
    fn test_parse_custom_scheme_path_form() {
        assert!(
            InviteLink::parse(
                "splitlist://app.internal/invite?listId=l1&token=tok123",
                &config()
            )
            .is_some()
        );
    }

    #[test]
    fn test_rejects_wrong_host() {
        assert!(
            InviteLink::parse("https://evil.example/invite?listId=l1&token=t", &config()).is_none()
        );
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        assert!(InviteLink::parse("ftp://splitlist.app/invite?listId=l1&token=t", &config()).is_none());
        assert!(InviteLink::parse("otherapp://invite?listId=l1&token=t", &config()).is_none());
    }

    #[test]
    fn test_rejects_missing_parameters() {
        assert!(InviteLink::parse("https://splitlist.app/invite?listId=l1", &config()).is_none());
        assert!(InviteLink::parse("https://splitlist.app/invite?token=t", &config()).is_none());
        assert!(InviteLink::parse("https://splitlist.app/invite", &config()).is_none());
    }

    #[test]
    fn test_rejects_non_invite_path() {
        assert!(
            InviteLink::parse("https://splitlist.app/lists?listId=l1&token=t", &config()).is_none()
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(InviteLink::parse("not a url at all", &config()).is_none());
        assert!(InviteLink::parse("", &config()).is_none());
    }

    #[test]
    fn test_built_urls_parse_back() {
        let config = config();
        let list_id = ListId::from("l1");
        let token = InviteToken::generate();

        for uri in [
            https_url(&config, &list_id, &token),
            custom_url(&config, &list_id, &token),
        ] {
            let link = InviteLink::parse(&uri, &config).unwrap();
            assert_eq!(link.list_id, list_id);
            assert_eq!(link.token, token);
        }
    }
}
