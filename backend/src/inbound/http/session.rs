//! Session identity for booking handlers.
//!
//! The identity collaborator signs users in elsewhere and leaves their id in
//! the shared session cookie. Handlers read it back as one half of a
//! [`Caller`]; the other half is the guest e-mail from the request body.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Caller, Error, GuestEmail, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Extractor wrapping the cookie session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store `user_id` as the signed-in identity.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user_id.as_ref())
            .map_err(|err| Error::internal(format!("failed to persist session: {err}")))
    }

    /// Signed-in user, if any.
    ///
    /// A cookie carrying something other than a user id is treated as
    /// anonymous rather than rejected, so the guest e-mail path still works.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let raw = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|err| Error::internal(format!("failed to read session: {err}")))?;
        Ok(raw.and_then(|raw| match UserId::new(&raw) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "ignoring malformed user id in session cookie");
                None
            }
        }))
    }

    /// Session identity combined with an e-mail supplied in the request.
    pub fn caller(&self, guest_email: Option<GuestEmail>) -> Result<Caller, Error> {
        Ok(Caller::new(self.user_id()?, guest_email))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);
        Box::pin(async move { session.await.map(Self::new) })
    }
}
