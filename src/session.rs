use crate::config::Theme;
use crate::error::StoreError;
use crate::models::User;
use crate::store::RemoteStore;
use tracing::info;

/// Who is signed in and how the UI looks. Built once at startup and dropped
/// on sign-out; view functions never see it.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub theme: Theme,
}

impl Session {
    pub fn new(user: Option<User>, theme: Theme) -> Session {
        Session { user, theme }
    }

    /// Owner filter for store queries. `None` means the anonymous key is
    /// used and rows are not scoped.
    pub fn owner_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn display_name(&self) -> &str {
        match &self.user {
            Some(User {
                email: Some(email), ..
            }) => email,
            Some(user) => &user.id,
            None => "Guest",
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    /// Ends the remote session and forgets the user even if the store
    /// call fails.
    pub async fn sign_out<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), StoreError> {
        let result = store.sign_out().await;
        if let Some(user) = self.user.take() {
            info!(user = %user.id, "signed out");
        }
        result
    }
}
