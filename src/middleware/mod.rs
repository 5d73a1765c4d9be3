use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, FromRequest, HttpRequest, HttpResponse,
};
use chrono::{Duration, Utc};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready as StdReady};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::db_operations::users_db_operations;
use crate::models::User;
use crate::DbPool;

pub const TOKEN_EXPIRE_HOURS: i64 = 24;
pub const TOKEN_EXPIRE_DAYS_REMEMBER: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
}

/// Issues a signed access token carrying the user id and email. Expiry is
/// 24 hours, or 30 days when the login carried the remember-me flag.
pub fn create_access_token(
    user_id: i64,
    email: &str,
    remember_me: bool,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_in = if remember_me {
        Duration::days(TOKEN_EXPIRE_DAYS_REMEMBER)
    } else {
        Duration::hours(TOKEN_EXPIRE_HOURS)
    };
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (Utc::now() + expires_in).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Decodes and validates the token, then checks the subject still exists.
/// A token referencing a deleted user is as invalid as a forged one.
fn resolve_user(req: &HttpRequest) -> Option<User> {
    let config = req.app_data::<web::Data<Config>>()?;
    let pool = req.app_data::<web::Data<DbPool>>()?;
    let token = bearer_token(req)?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    let user_id = data.claims.sub.parse::<i64>().ok()?;

    let conn = pool.get().ok()?;
    users_db_operations::read_user_by_id(&conn, user_id)
}

/// Strict authentication extractor: admin-gated endpoints take this and any
/// failure surfaces as a uniform 401.
#[derive(Debug, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        match resolve_user(req) {
            Some(user) => ready(Ok(AuthenticatedUser {
                id: user.id,
                email: user.email,
                name: user.name,
            })),
            None => ready(Err(ApiError::unauthorized().into())),
        }
    }
}

/// Optional form of the same check. Public handlers take this to distinguish
/// the public view of a resource from the admin view; it never fails.
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl MaybeUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl FromRequest for MaybeUser {
    type Error = actix_web::Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let user = resolve_user(req).map(|user| AuthenticatedUser {
            id: user.id,
            email: user.email,
            name: user.name,
        });
        ready(Ok(MaybeUser(user)))
    }
}

/// 301-redirects www.{host} to the naked domain when enabled in config.
pub struct RedirectWwwToNaked {
    pub enabled: bool,
    pub www_host: String,
    pub naked_host: String,
}

impl RedirectWwwToNaked {
    pub fn from_config(config: &Config) -> Self {
        RedirectWwwToNaked {
            enabled: config.redirect_www_to_naked && !config.www_host.is_empty(),
            www_host: config.www_host.clone(),
            naked_host: config.naked_host.clone(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RedirectWwwToNaked
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RedirectWwwToNakedMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RedirectWwwToNakedMiddleware {
            service,
            enabled: self.enabled,
            www_host: self.www_host.clone(),
            naked_host: self.naked_host.clone(),
        })
    }
}

pub struct RedirectWwwToNakedMiddleware<S> {
    service: S,
    enabled: bool,
    www_host: String,
    naked_host: String,
}

impl<S, B> Service<ServiceRequest> for RedirectWwwToNakedMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| h.split(':').next().unwrap_or(h).to_string());

        let redirect = self.enabled && host.as_deref() == Some(self.www_host.as_str());

        if !redirect {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        let location = {
            let path = req.path().to_string();
            let qs = req.query_string();
            if qs.is_empty() {
                format!("https://{}{}", self.naked_host, path)
            } else {
                format!("https://{}{}?{}", self.naked_host, path, qs)
            }
        };
        Box::pin(async move {
            let (http_req, _payload) = req.into_parts();
            let res = HttpResponse::MovedPermanently()
                .insert_header((header::LOCATION, location))
                .finish()
                .map_into_right_body();
            Ok(ServiceResponse::new(http_req, res))
        })
    }
}
