use crate::quota::{QuotaState, UserQuotaRecord};

/// Rendered notification. Both delivery paths send the same content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Builds the alert for a record in an exceeded state; `None` for
    /// records that are within quota.
    pub fn for_record(record: &UserQuotaRecord, hostname: &str) -> Option<Self> {
        let limit = record.state().limit_label()?;

        let mut body = format!(
            "You are receiving this message because your disk usage on {hostname} exceeded its {limit}.\n\
             \n\
             Details:\n\
             \tAccount: {user}\n\
             \tLimit triggered: {limit}\n\
             \tCurrently used: {used:.2}GB\n\
             \tSoft limit: {soft:.2}GB\n\
             \tHard limit: {hard:.2}GB\n\
             \n\
             Please reduce the size of your home directory.\n",
            user = record.user,
            used = record.used_gb(),
            soft = record.soft_limit_gb(),
            hard = record.hard_limit_gb(),
        );

        match record.state() {
            QuotaState::SoftExceeded => body.push_str(
                "Write access will be denied once the grace period expires. \
                 Run `repquota -as` on the server to see how much time is left.\n",
            ),
            _ => body.push_str(
                "Writes to your home directory are denied until usage is back under quota. \
                 Run `repquota -as` on the server to inspect your quota.\n",
            ),
        }
        body.push_str(
            "No further notifications are sent for this exceedance. \
             Do not reply to this message; contact the server administrator with any questions.\n",
        );

        Some(Self {
            subject: format!("Disk Limit Exceeded on {hostname}"),
            body,
        })
    }
}
