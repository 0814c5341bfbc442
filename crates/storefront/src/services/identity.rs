//! Checkout identity resolution.
//!
//! Decides who is placing an order and makes sure the matching user row
//! exists. There are three cases:
//!
//! - **Authenticated**: a verified session is present. The order belongs to
//!   that user, and their stored name and address follow the checkout.
//! - **Create account**: no session, but the shopper supplied a password
//!   long enough to ask for an account. A user row is created from the
//!   shipping address.
//! - **Guest**: everything else. No user row is touched.
//!
//! The immediate checkout paths use [`IdentityResolver::resolve`]. The
//! payment-intent path splits the work: [`IdentityResolver::prepare_deferred`]
//! runs before the payment (hashing the password so the plaintext never
//! leaves this request) and [`IdentityResolver::complete_deferred`] runs from
//! the webhook once the payment succeeded.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use aerox_core::{Email, EmailError, ShippingAddress, UserId};

use crate::config::PasswordPolicy;
use crate::db::{RepositoryError, UserStore};
use crate::models::{CurrentUser, NewUser};
use crate::services::auth::{self, WeakPassword};

/// Errors from identity resolution.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    WeakPassword(#[from] WeakPassword),

    #[error("invalid account email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The shipping email already has an account.
    #[error("An account with this email already exists. Please log in or use a different email.")]
    EmailExists,

    /// The session names a user that no longer exists.
    #[error("session user no longer exists")]
    UnknownUser,

    #[error("password hashing error")]
    PasswordHash,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Who is checking out.
pub enum CheckoutActor {
    Authenticated(CurrentUser),
    CreateAccount { email: Email, password: SecretString },
    Guest,
}

impl fmt::Debug for CheckoutActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated(user) => f.debug_tuple("Authenticated").field(user).finish(),
            Self::CreateAccount { email, .. } => f
                .debug_struct("CreateAccount")
                .field("email", email)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Guest => f.write_str("Guest"),
        }
    }
}

/// An account to create once payment succeeds.
#[derive(Clone)]
pub struct PendingAccount {
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: SecretString,
}

impl fmt::Debug for PendingAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAccount")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for PendingAccount {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
            && self.password_hash.expose_secret() == other.password_hash.expose_secret()
    }
}

/// Identity captured before a deferred payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeferredIdentity {
    /// Session user at intent time.
    pub user_id: Option<UserId>,
    /// Account requested by a guest.
    pub account: Option<PendingAccount>,
}

/// Result of resolving an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Owner of the order, `None` for guests.
    pub user_id: Option<UserId>,
    /// `true` only for the call that inserted the user row.
    pub is_new_account: bool,
    /// Identity to log the shopper in as, set when an account was created
    /// during an immediate checkout.
    pub new_session: Option<CurrentUser>,
}

impl Resolution {
    const fn guest() -> Self {
        Self {
            user_id: None,
            is_new_account: false,
            new_session: None,
        }
    }

    const fn existing(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            is_new_account: false,
            new_session: None,
        }
    }
}

/// Resolves checkout actors against the user store.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
    policy: PasswordPolicy,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, policy: PasswordPolicy) -> Self {
        Self { users, policy }
    }

    /// Classify the actor. Pure: nothing is read or written.
    ///
    /// A password shorter than the policy minimum means "no account"
    /// rather than an error, so a shopper who typed something short still
    /// checks out as a guest.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::WeakPassword` when a long-enough password
    /// breaks the digit or uppercase rule, and `IdentityError::InvalidEmail`
    /// when the shipping email cannot key an account.
    pub fn classify(
        &self,
        session: Option<&CurrentUser>,
        password: Option<&str>,
        address: &ShippingAddress,
    ) -> Result<CheckoutActor, IdentityError> {
        if let Some(user) = session {
            return Ok(CheckoutActor::Authenticated(user.clone()));
        }

        let Some(password) =
            password.filter(|p| p.chars().count() >= self.policy.min_length)
        else {
            return Ok(CheckoutActor::Guest);
        };

        auth::validate_password(&self.policy, password)?;
        let email = Email::parse(&address.email)?;

        Ok(CheckoutActor::CreateAccount {
            email,
            password: SecretString::from(password),
        })
    }

    /// Resolve an actor for an immediate checkout.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::EmailExists` when an account would be created
    /// for an email that is already registered.
    pub async fn resolve(
        &self,
        actor: CheckoutActor,
        address: &ShippingAddress,
    ) -> Result<Resolution, IdentityError> {
        match actor {
            CheckoutActor::Authenticated(user) => {
                self.remember_address(user.id, address).await?;
                Ok(Resolution::existing(user.id))
            }
            CheckoutActor::CreateAccount { email, password } => {
                self.ensure_email_free(&email).await?;
                let password_hash = hash(&password)?;

                let new_user = NewUser::from_checkout(email, password_hash, address);
                let user = self.users.create(&new_user).await.map_err(|e| match e {
                    RepositoryError::Conflict(_) => IdentityError::EmailExists,
                    other => IdentityError::Repository(other),
                })?;

                tracing::info!(user_id = %user.id, "Account created at checkout");
                Ok(Resolution {
                    user_id: Some(user.id),
                    is_new_account: true,
                    new_session: Some(CurrentUser {
                        id: user.id,
                        email: user.email,
                    }),
                })
            }
            CheckoutActor::Guest => Ok(Resolution::guest()),
        }
    }

    /// First half of a deferred checkout: everything except the insert.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::EmailExists` if a guest asks for an account
    /// under an email that is already registered.
    pub async fn prepare_deferred(
        &self,
        actor: CheckoutActor,
        address: &ShippingAddress,
    ) -> Result<DeferredIdentity, IdentityError> {
        match actor {
            CheckoutActor::Authenticated(user) => {
                self.remember_address(user.id, address).await?;
                Ok(DeferredIdentity {
                    user_id: Some(user.id),
                    account: None,
                })
            }
            CheckoutActor::CreateAccount { email, password } => {
                self.ensure_email_free(&email).await?;
                Ok(DeferredIdentity {
                    user_id: None,
                    account: Some(PendingAccount {
                        email,
                        password_hash: SecretString::from(hash(&password)?),
                    }),
                })
            }
            CheckoutActor::Guest => Ok(DeferredIdentity::default()),
        }
    }

    /// Second half of a deferred checkout, run after payment succeeded.
    ///
    /// A pending account is created with a guarded upsert: if the email was
    /// registered in the meantime (a retry, a redelivered event, or the
    /// shopper signing up by hand) the existing row is reused. A session user
    /// that has since disappeared degrades to a guest order.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` on store failure.
    pub async fn complete_deferred(
        &self,
        identity: &DeferredIdentity,
        address: &ShippingAddress,
    ) -> Result<Resolution, IdentityError> {
        if let Some(account) = &identity.account {
            let new_user = NewUser::from_checkout(
                account.email.clone(),
                account.password_hash.expose_secret().to_owned(),
                address,
            );
            let (user, created) = self.users.create_or_get(&new_user).await?;

            if created {
                tracing::info!(user_id = %user.id, "Account created from payment");
            } else {
                tracing::info!(user_id = %user.id, "Reusing existing account for payment");
            }

            return Ok(Resolution {
                user_id: Some(user.id),
                is_new_account: created,
                new_session: None,
            });
        }

        if let Some(user_id) = identity.user_id {
            return match self.remember_address(user_id, address).await {
                Ok(()) => Ok(Resolution::existing(user_id)),
                Err(IdentityError::UnknownUser) => {
                    tracing::warn!(%user_id, "Paying user no longer exists, recording guest order");
                    Ok(Resolution::guest())
                }
                Err(e) => Err(e),
            };
        }

        Ok(Resolution::guest())
    }

    async fn remember_address(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<(), IdentityError> {
        self.users
            .update_profile(user_id, Some(&address.full_name()), Some(address))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => IdentityError::UnknownUser,
                other => IdentityError::Repository(other),
            })
    }

    async fn ensure_email_free(&self, email: &Email) -> Result<(), IdentityError> {
        if self.users.get_by_email(email).await?.is_some() {
            return Err(IdentityError::EmailExists);
        }
        Ok(())
    }
}

fn hash(password: &SecretString) -> Result<String, IdentityError> {
    auth::hash_password(password.expose_secret()).map_err(|_| IdentityError::PasswordHash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn address(email: &str) -> ShippingAddress {
        ShippingAddress {
            first_name: "Mara".to_owned(),
            last_name: "Quist".to_owned(),
            email: email.to_owned(),
            address: "4 Track Lane".to_owned(),
            city: "Lyon".to_owned(),
            postal_code: "69001".to_owned(),
        }
    }

    fn resolver() -> (Arc<MemoryStore>, IdentityResolver) {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone(), PasswordPolicy::default());
        (store, resolver)
    }

    #[test]
    fn test_classify_decision_table() {
        let (_, resolver) = resolver();
        let addr = address("mara@aero-x.dev");
        let session = CurrentUser {
            id: UserId::new(3),
            email: Email::parse("other@aero-x.dev").unwrap(),
        };

        assert!(matches!(
            resolver.classify(Some(&session), Some("Sprint2024"), &addr),
            Ok(CheckoutActor::Authenticated(u)) if u.id == UserId::new(3)
        ));
        assert!(matches!(
            resolver.classify(None, Some("Sprint2024"), &addr),
            Ok(CheckoutActor::CreateAccount { .. })
        ));
        assert!(matches!(
            resolver.classify(None, Some("short"), &addr),
            Ok(CheckoutActor::Guest)
        ));
        assert!(matches!(
            resolver.classify(None, None, &addr),
            Ok(CheckoutActor::Guest)
        ));
        assert!(matches!(
            resolver.classify(None, Some("sprint2024"), &addr),
            Err(IdentityError::WeakPassword(WeakPassword::MissingUppercase))
        ));
        assert!(matches!(
            resolver.classify(None, Some("Sprintxxxx"), &addr),
            Err(IdentityError::WeakPassword(WeakPassword::MissingDigit))
        ));
    }

    #[test]
    fn test_create_account_debug_hides_password() {
        let (_, resolver) = resolver();
        let actor = resolver
            .classify(None, Some("Sprint2024"), &address("mara@aero-x.dev"))
            .unwrap();
        assert!(!format!("{actor:?}").contains("Sprint2024"));
    }

    #[tokio::test]
    async fn test_resolve_creates_account_once() {
        let (store, resolver) = resolver();
        let addr = address("mara@aero-x.dev");

        let actor = resolver.classify(None, Some("Sprint2024"), &addr).unwrap();
        let resolution = resolver.resolve(actor, &addr).await.unwrap();
        assert!(resolution.is_new_account);
        assert!(resolution.new_session.is_some());

        let user = store.get_by_id(resolution.user_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Mara Quist"));
        assert_eq!(user.shipping_address, Some(addr.clone()));

        let again = resolver.classify(None, Some("Sprint2024"), &addr).unwrap();
        assert!(matches!(
            resolver.resolve(again, &addr).await,
            Err(IdentityError::EmailExists)
        ));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_authenticated_updates_address() {
        let (store, resolver) = resolver();
        let created = store
            .create(&NewUser {
                email: Email::parse("mara@aero-x.dev").unwrap(),
                password_hash: "h".to_owned(),
                name: None,
                shipping_address: None,
            })
            .await
            .unwrap();
        let session = CurrentUser {
            id: created.id,
            email: created.email.clone(),
        };

        let addr = address("mara@aero-x.dev");
        let actor = resolver.classify(Some(&session), None, &addr).unwrap();
        let resolution = resolver.resolve(actor, &addr).await.unwrap();

        assert_eq!(resolution.user_id, Some(created.id));
        assert!(!resolution.is_new_account);
        let user = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(user.shipping_address, Some(addr));
    }

    #[tokio::test]
    async fn test_guest_touches_nothing() {
        let (store, resolver) = resolver();
        let addr = address("mara@aero-x.dev");
        let actor = resolver.classify(None, Some("short"), &addr).unwrap();
        let resolution = resolver.resolve(actor, &addr).await.unwrap();
        assert_eq!(resolution.user_id, None);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_deferred_prepare_inserts_nothing() {
        let (store, resolver) = resolver();
        let addr = address("mara@aero-x.dev");
        let actor = resolver.classify(None, Some("Sprint2024"), &addr).unwrap();

        let deferred = resolver.prepare_deferred(actor, &addr).await.unwrap();
        let account = deferred.account.as_ref().unwrap();
        assert!(account.password_hash.expose_secret().starts_with("$argon2id$"));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_deferred_reuses_existing_account() {
        let (store, resolver) = resolver();
        let addr = address("mara@aero-x.dev");
        let actor = resolver.classify(None, Some("Sprint2024"), &addr).unwrap();
        let deferred = resolver.prepare_deferred(actor, &addr).await.unwrap();

        let first = resolver.complete_deferred(&deferred, &addr).await.unwrap();
        let second = resolver.complete_deferred(&deferred, &addr).await.unwrap();

        assert!(first.is_new_account);
        assert!(!second.is_new_account);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_deferred_missing_user_falls_back_to_guest() {
        let (_, resolver) = resolver();
        let deferred = DeferredIdentity {
            user_id: Some(UserId::new(42)),
            account: None,
        };
        let resolution = resolver
            .complete_deferred(&deferred, &address("mara@aero-x.dev"))
            .await
            .unwrap();
        assert_eq!(resolution.user_id, None);
    }
}
