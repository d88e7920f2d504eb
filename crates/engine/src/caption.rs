//! Caption text for delivered files and backed-up posts.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use stashlink_core::{LinkConfig, UserId};

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-zA-Z0-9_]+").expect("mention regex is valid"));

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(www\.|https?://)\S+").expect("url regex is valid"));

/// Matches a fast-download `get` link and captures the file unique id.
///
/// The capture stops only at `)`, so in plain text it swallows the rest of
/// the caption after the id. Ids that contain `)` are cut short.
static GET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://.*?/get/\d+_([^)]+)").expect("get-link regex is valid")
});

/// Remove channel mentions and links from an uploaded file name and turn
/// underscores into spaces.
pub fn clean_file_name(raw: &str) -> String {
    let without_mentions = MENTION.replace_all(raw, "");
    let without_urls = URL.replace_all(&without_mentions, "");
    without_urls.trim().replace('_', " ")
}

/// Caption attached to a delivered file.
///
/// The name links to `filename_url` when the owner set one and is shown as
/// inline code otherwise. `suffix` is appended verbatim.
pub fn delivery_caption(file_name: &str, filename_url: Option<&str>, suffix: &str) -> String {
    let name = clean_file_name(file_name);
    let name_part = match filename_url {
        Some(url) => format!("[{name}]({url})"),
        None => format!("`{name}`"),
    };
    format!("✅ **Here is your file!**\n\n{name_part}{suffix}")
}

/// Point every `get` link in `caption` at `new_owner` on the current host.
pub fn rewrite_get_links(caption: &str, new_owner: UserId, links: &LinkConfig) -> String {
    GET_LINK
        .replace_all(caption, |caps: &Captures<'_>| links.get_url(new_owner, &caps[1]))
        .into_owned()
}
