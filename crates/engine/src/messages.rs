//! User-facing message text.

pub const LINK_READY: &str =
    "✅ **Your link is ready!**\n\nClick the button below to get your file directly.";
pub const LINK_READY_BUTTON: &str = "➡️ Get Your File ⬅️";

pub const ALMOST_READY: &str = "**Your file is almost ready!**\n\n1. Click the button below.\n2. You will be redirected back, and I will send you the file.";
pub const ALMOST_READY_BUTTON: &str = "➡️ Click Here to Get Your File ⬅️";

pub const ALREADY_VERIFIED: &str = "✅ **You are verified!**\n\nYour 12-hour verification is active. Click below to get your file directly.";
pub const ALREADY_VERIFIED_BUTTON: &str = "➡️ Get Your File Directly ⬅️";

pub const VERIFY_REQUIRED: &str = "**One-Time Verification Required**\n\nTo get direct access for 12 hours, please complete this one-time verification step.";
pub const VERIFY_REQUIRED_BUTTON: &str = "➡️ Click to Verify (12 Hours) ⬅️";

pub const VERIFICATION_SUCCESS: &str = "✅ **Verification Successful!**\n\nYou can now get direct links from this user's channels for the next 12 hours.";

pub const HOW_TO_DOWNLOAD_BUTTON: &str = "❓ How to Download";
pub const JOIN_CHANNEL_BUTTON: &str = "📢 Join Channel";
pub const RETRY_BUTTON: &str = "🔄 Retry";
pub const FAST_DOWNLOAD_BUTTON: &str = "⚡ Fast Download";
pub const SHARE_LINK_BUTTON: &str = "🔗 Share Link";
pub const CANCEL_BACKUP_BUTTON: &str = "❌ Cancel Backup";

pub const GENERIC_APOLOGY: &str = "Something went wrong while processing your request. Please try again later.";
pub const RETRY_BLOCKED: &str = "Could not retry because you have blocked the bot.";
pub const NOT_FOR_YOU: &str = "This button is not for you.";
pub const WELCOME: &str = "👋 Send me a file and I will give you a shareable link for it.";
pub const NOT_CONFIGURED: &str =
    "The bot is not configured to store files yet. Please contact the admin.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const CANCELLED: &str = "Cancelled.";
pub const RESTART_CANCELLED: &str =
    "❗️ Your previous action was cancelled because the bot restarted. Please start it again.";

pub const PERMISSION_DENIED: &str =
    "❌ **Permission Denied!**\n\nMake me an admin in that channel and try again.";
pub const FORWARD_REQUIRED: &str = "❌ Please forward a message from a channel.";
pub const TEXT_REQUIRED: &str = "❌ Please send the value as a text message.";
pub const INVALID_LINK: &str = "❌ That link did not respond. Please check it and try again.";
pub const FOOTER_TEXT_TOO_LONG: &str = "❌ Button text must be at most 50 bytes.";
pub const FOOTER_LIMIT: &str = "❌ You can add at most 3 footer buttons.";
pub const SHORTENER_INVALID: &str =
    "❌ **Shortener validation failed!**\n\nCheck the domain and API key and try again.";
pub const UNKNOWN_CHANNEL: &str = "❌ That channel is not one of your post channels.";

pub const FSUB_SET: &str = "✅ **FSub channel set!**";
pub const FSUB_REMOVED: &str = "✅ FSub channel removed.";
pub const POST_CHANNEL_ADDED: &str = "✅ Channel added.";
pub const FILENAME_LINK_SET: &str = "✅ File name link updated.";
pub const HOW_TO_DOWNLOAD_SET: &str = "✅ \"How to Download\" link updated.";
pub const SHORTENER_SET: &str = "✅ **Shortener set!**";
pub const FOOTER_ADDED: &str = "✅ Footer button added.";

pub const BACKUP_ALREADY_RUNNING: &str = "A backup process is already running for you.";
pub const BACKUP_NO_CHANNELS: &str = "You have no post channels to back up.";
pub const BACKUP_CHOOSE_SOURCE: &str = "Choose the channel to back up:";
pub const BACKUP_PICK_BUTTON: &str = "Pick the channel with the buttons. Send /backup to start again.";
pub const BACKUP_NO_POSTS: &str = "No backed-up posts found for this channel.";
pub const BACKUP_CANCELLED: &str = "❌ Backup cancelled by user.";
pub const BACKUP_LOAD_FAILED: &str = "❌ Backup failed: the saved posts could not be loaded.";
pub const BACKUP_ITEM_SKIPPED: &str = "⚠️ Skipped one post during backup due to an error.";
pub const BACKUP_CANCELLING: &str = "Cancelling backup...";
pub const BACKUP_NOT_RUNNING: &str = "No backup is running.";

pub fn shortener_toggled(enabled: bool) -> String {
    format!(
        "✅ Shortener is now **{}**.",
        if enabled { "enabled" } else { "disabled" }
    )
}

pub fn shortener_mode_changed(label: &str) -> String {
    format!("✅ Shortener mode is now **{label}**.")
}

pub fn fsub_channel_error(channel: impl std::fmt::Display) -> String {
    format!(
        "⚠️ **FSub Channel Error**\n\nA user was unable to access your file because your FSub channel (`{channel}`) is no longer valid. It has been removed from your settings. Please set a new one."
    )
}

pub fn storage_alert(channel: impl std::fmt::Display, detail: impl std::fmt::Display) -> String {
    format!(
        "⚠️ **CRITICAL ERROR**\n\nThe bot cannot use the owner-db channel `{channel}`: {detail}\n\nMake sure the bot is an admin there and OWNER_DB_CHANNEL is correct."
    )
}

pub fn file_saved(name: &str) -> String {
    format!("✅ **File saved!**\n\n`{name}`")
}

pub fn channel_removed(posts: u64) -> String {
    format!("✅ Channel removed. {posts} saved posts deleted.")
}

pub fn backup_starting(total: usize) -> String {
    format!("🚀 Starting backup of {total} posts...")
}

pub fn backup_progress(sent: usize, total: usize) -> String {
    format!("🔄 Backing up... Progress: {sent} / {total} posts sent.")
}

pub fn backup_complete(total: usize, skipped: usize) -> String {
    if skipped == 0 {
        format!("✅ **Backup Complete!**\n\nSuccessfully backed up {total} posts.")
    } else {
        format!(
            "✅ **Backup Complete!**\n\nProcessed {total} posts, {skipped} skipped due to errors."
        )
    }
}

pub fn prompt(text: &str) -> String {
    format!("{text}\n\nSend /cancel to abort.")
}
