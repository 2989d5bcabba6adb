use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        AuthResponse, EmailRequest, LoginResponse, SessionUser, UpdateAdminMe, UpdateMemberMe,
        VerifyOtpRequest,
    },
    extractors::AuthUser,
    gate::{protect, MEMBER, STAFF},
    services,
};
use crate::{
    accounts::{AccountKind, AccountView},
    error::{ApiResponse, ApiResult},
    extract::{Upload, ValidatedJson},
    media::{self, MAX_UPLOAD_BYTES},
    state::AppState,
};

/// Which account domain an auth route serves.
pub trait Portal: Send + Sync + 'static {
    const KIND: AccountKind;
}

pub struct Members;
pub struct Admins;

impl Portal for Members {
    const KIND: AccountKind = AccountKind::Member;
}

impl Portal for Admins {
    const KIND: AccountKind = AccountKind::Admin;
}

fn otp_routes<P: Portal>() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login::<P>))
        .route("/auth/resend-otp", post(resend_otp::<P>))
        .route("/auth/verify-otp", post(verify_otp::<P>))
}

pub fn member_router(state: &AppState) -> Router<AppState> {
    let me = Router::new()
        .route("/auth/me", get(get_me).patch(update_member_me))
        .route(
            "/auth/me/avatar",
            post(upload_my_avatar).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        );
    otp_routes::<Members>().merge(protect(me, state, MEMBER))
}

pub fn admin_router(state: &AppState) -> Router<AppState> {
    let me = Router::new().route("/auth/me", get(get_me).patch(update_admin_me));
    otp_routes::<Admins>().merge(protect(me, state, STAFF))
}

#[instrument(skip(state, body), fields(kind = P::KIND.as_str()))]
pub async fn login<P: Portal>(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    services::login(&state, P::KIND, &body.email).await?;
    Ok(ApiResponse::ok(
        "OTP sent to your email",
        LoginResponse { email: body.email },
    ))
}

#[instrument(skip(state, body), fields(kind = P::KIND.as_str()))]
pub async fn resend_otp<P: Portal>(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    services::resend(&state, P::KIND, &body.email).await?;
    Ok(ApiResponse::ok(
        "OTP resent to your email",
        LoginResponse { email: body.email },
    ))
}

#[instrument(skip(state, body), fields(kind = P::KIND.as_str()))]
pub async fn verify_otp<P: Portal>(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<VerifyOtpRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let (account, token) = services::verify(&state, P::KIND, &body.email, &body.otp).await?;
    Ok(ApiResponse::ok(
        "Login successful",
        AuthResponse {
            token,
            user: SessionUser {
                id: account.id,
                email: account.email,
                role: account.role,
            },
        },
    ))
}

#[instrument(skip(state, claims), fields(account_id = %claims.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let account = services::me(&state, &claims).await?;
    Ok(ApiResponse::ok("Profile fetched", account.view()))
}

#[instrument(skip(state, claims, body), fields(account_id = %claims.sub))]
pub async fn update_member_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateMemberMe>,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let account = services::update_me(&state, &claims, body.into_patch()).await?;
    Ok(ApiResponse::ok("Profile updated", account.view()))
}

#[instrument(skip(state, claims, body), fields(account_id = %claims.sub))]
pub async fn update_admin_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateAdminMe>,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let account = services::update_me(&state, &claims, body.into_patch()).await?;
    Ok(ApiResponse::ok("Profile updated", account.view()))
}

#[instrument(skip(state, claims, mp), fields(account_id = %claims.sub))]
pub async fn upload_my_avatar(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Upload(mut mp): Upload,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let upload = media::read_image(&mut mp, "avatar").await?;
    let current = services::me(&state, &claims).await?;
    let account = services::replace_avatar(&state, &current, &upload).await?;
    Ok(ApiResponse::ok("Avatar updated", account.view()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    use crate::{
        accounts::{Account, AccountKind, Role},
        testing::{empty_request, image_request, json_request, send, Harness},
    };

    const LOGIN: &str = "/public/api/auth/login";
    const VERIFY: &str = "/public/api/auth/verify-otp";
    const ADMIN_LOGIN: &str = "/private/api/auth/login";
    const ADMIN_VERIFY: &str = "/private/api/auth/verify-otp";

    fn admin(email: &str, role: Role) -> Account {
        let mut a = Account::provision(AccountKind::Admin, email, role, OffsetDateTime::now_utc());
        a.full_name = Some("Ops".into());
        a
    }

    #[tokio::test]
    async fn member_login_provisions_and_mails() {
        let h = Harness::new();
        let (status, body) = send(
            h.app(),
            json_request(Method::POST, LOGIN, None, json!({"email": " Bob@Example.com "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["email"], "bob@example.com");

        let stored = h.accounts.get(AccountKind::Member, "bob@example.com").unwrap();
        assert!(stored.has_challenge());
        assert!(!stored.is_verified);
        assert_eq!(h.mailer.sent().len(), 1);
        assert_eq!(h.mailer.sent()[0].to, "bob@example.com");
    }

    #[tokio::test]
    async fn admin_login_for_unknown_email_is_404_and_silent() {
        let h = Harness::new();
        let (status, body) = send(
            h.app(),
            json_request(Method::POST, ADMIN_LOGIN, None, json!({"email": "ghost@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Admin not found");
        assert!(h.accounts.snapshot().is_empty());
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_email_aggregates_messages() {
        let h = Harness::new();
        let (status, body) =
            send(h.app(), json_request(Method::POST, LOGIN, None, json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let msg = body["message"].as_str().unwrap();
        assert!(msg.contains("Email is required"));
        assert!(msg.contains("Invalid email format"));
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn verify_issues_token_once() {
        let h = Harness::new();
        send(
            h.app(),
            json_request(Method::POST, LOGIN, None, json!({"email": "bob@example.com"})),
        )
        .await;
        let code = h.mailer.last_code("bob@example.com").unwrap();

        let body = json!({"email": "bob@example.com", "otp": code});
        let (status, res) = send(h.app(), json_request(Method::POST, VERIFY, None, body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["data"]["user"]["email"], "bob@example.com");
        assert_eq!(res["data"]["user"]["role"], "member");
        let token = res["data"]["token"].as_str().unwrap();
        let claims = h.state.jwt.verify(token).unwrap();
        assert_eq!(claims.role, Role::Member);

        let stored = h.accounts.get(AccountKind::Member, "bob@example.com").unwrap();
        assert!(stored.is_verified);
        assert!(stored.otp.is_none() && stored.otp_expires_at.is_none());
        assert!(stored.last_login_at.is_some());

        let (status, res) = send(h.app(), json_request(Method::POST, VERIFY, None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["message"], "Invalid or expired OTP");
    }

    #[tokio::test]
    async fn wrong_and_expired_codes_look_the_same() {
        let mut bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        bob.otp = Some("111111".into());
        bob.otp_expires_at = Some(OffsetDateTime::now_utc() - Duration::seconds(1));
        let h = Harness::with_accounts(vec![bob]);

        let (s1, expired) = send(
            h.app(),
            json_request(Method::POST, VERIFY, None, json!({"email": "bob@example.com", "otp": "111111"})),
        )
        .await;
        send(
            h.app(),
            json_request(Method::POST, LOGIN, None, json!({"email": "bob@example.com"})),
        )
        .await;
        let code = h.mailer.last_code("bob@example.com").unwrap();
        let wrong = if code == "000000" { "999999" } else { "000000" };
        let (s2, mismatch) = send(
            h.app(),
            json_request(Method::POST, VERIFY, None, json!({"email": "bob@example.com", "otp": wrong})),
        )
        .await;
        assert_eq!(s1, StatusCode::BAD_REQUEST);
        assert_eq!(s2, StatusCode::BAD_REQUEST);
        assert_eq!(expired, mismatch);
        let stored = h.accounts.get(AccountKind::Member, "bob@example.com").unwrap();
        assert_eq!(stored.failed_otp_attempts, 1);
    }

    #[tokio::test]
    async fn too_many_wrong_codes_burn_the_challenge() {
        let h = Harness::with_accounts(vec![admin("ops@example.com", Role::Admin)]);
        send(
            h.app(),
            json_request(Method::POST, ADMIN_LOGIN, None, json!({"email": "ops@example.com"})),
        )
        .await;
        let code = h.mailer.last_code("ops@example.com").unwrap();
        let wrong = if code == "000000" { "999999" } else { "000000" };
        for _ in 0..5 {
            send(
                h.app(),
                json_request(Method::POST, ADMIN_VERIFY, None, json!({"email": "ops@example.com", "otp": wrong})),
            )
            .await;
        }
        let (status, _) = send(
            h.app(),
            json_request(Method::POST, ADMIN_VERIFY, None, json!({"email": "ops@example.com", "otp": code})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!h.accounts.get(AccountKind::Admin, "ops@example.com").unwrap().has_challenge());
    }

    #[tokio::test]
    async fn admin_verify_returns_owner_role() {
        let h = Harness::with_accounts(vec![admin("root@example.com", Role::Owner)]);
        send(
            h.app(),
            json_request(Method::POST, ADMIN_LOGIN, None, json!({"email": "root@example.com"})),
        )
        .await;
        let code = h.mailer.last_code("root@example.com").unwrap();
        let (status, res) = send(
            h.app(),
            json_request(Method::POST, ADMIN_VERIFY, None, json!({"email": "root@example.com", "otp": code})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["data"]["user"]["role"], "owner");
    }

    #[tokio::test]
    async fn resend_requires_an_account() {
        let h = Harness::new();
        let (status, body) = send(
            h.app(),
            json_request(Method::POST, "/public/api/auth/resend-otp", None, json!({"email": "new@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Member not found");
    }

    #[tokio::test]
    async fn inactive_accounts_cannot_sign_in() {
        let mut ops = admin("ops@example.com", Role::Admin);
        ops.is_active = false;
        let mut bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        bob.is_active = false;
        let h = Harness::with_accounts(vec![ops, bob]);

        let (s1, _) = send(
            h.app(),
            json_request(Method::POST, ADMIN_LOGIN, None, json!({"email": "ops@example.com"})),
        )
        .await;
        let (s2, _) = send(
            h.app(),
            json_request(Method::POST, LOGIN, None, json!({"email": "bob@example.com"})),
        )
        .await;
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!(s2, StatusCode::NOT_FOUND);
        assert_eq!(h.accounts.snapshot().len(), 2);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn mail_outage_is_an_upstream_error() {
        let h = Harness::new();
        h.mailer.fail(true);
        let (status, body) = send(
            h.app(),
            json_request(Method::POST, LOGIN, None, json!({"email": "bob@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().starts_with("mail request failed"));
    }

    #[tokio::test]
    async fn me_requires_a_token_and_hides_otp_state() {
        let mut bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        bob.otp = Some("123456".into());
        let h = Harness::with_accounts(vec![bob.clone()]);

        let (status, _) = send(h.app(), empty_request(Method::GET, "/public/api/auth/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = h.token_for(&bob);
        let (status, body) = send(
            h.app(),
            empty_request(Method::GET, "/public/api/auth/me", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "bob@example.com");
        assert!(body["data"].get("otp").is_none());
    }

    #[tokio::test]
    async fn member_token_cannot_read_admin_me() {
        let bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        let h = Harness::with_accounts(vec![bob.clone()]);
        let token = h.token_for(&bob);
        let (status, _) = send(
            h.app(),
            empty_request(Method::GET, "/private/api/auth/me", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn patch_me_updates_only_given_fields() {
        let mut bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        bob.full_name = Some("Bob".into());
        let h = Harness::with_accounts(vec![bob.clone()]);
        let token = h.token_for(&bob);

        let (status, body) = send(
            h.app(),
            json_request(
                Method::PATCH,
                "/public/api/auth/me",
                Some(&token),
                json!({"dharma_name": "Tam An", "date_of_birth": "1990-04-02"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["full_name"], "Bob");
        assert_eq!(body["data"]["dharma_name"], "Tam An");
        assert_eq!(body["data"]["date_of_birth"], "1990-04-02");

        let (status, body) = send(
            h.app(),
            json_request(Method::PATCH, "/public/api/auth/me", Some(&token), json!({"phone": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Phone must be 9-15 digits");
    }

    #[tokio::test]
    async fn avatar_replacement_discards_the_old_asset() {
        let mut bob = Account::provision(
            AccountKind::Member,
            "bob@example.com",
            Role::Member,
            OffsetDateTime::now_utc(),
        );
        bob.avatar = Some(crate::accounts::Asset {
            url: "https://media.test/old".into(),
            public_id: "old".into(),
        });
        let h = Harness::with_accounts(vec![bob.clone()]);
        let token = h.token_for(&bob);

        let (status, body) = send(
            h.app(),
            image_request("/public/api/auth/me/avatar", Some(&token), "avatar"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["avatar"]["public_id"], "test/avatars/1");
        assert_eq!(h.media.destroyed(), vec!["old".to_string()]);
    }
}
