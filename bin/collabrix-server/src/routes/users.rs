use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::auth::{AuthError, hash_password, verify_password};
use crate::entities::{ProfilePatch, UserRecord, UserStore};
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::users::{
    AuthResponse, LoginRequest, ProfileResponse, RandomUsersQuery, RatingRequest, RegisterRequest,
    UpdateProfileRequest, non_empty,
};
use crate::state::AppState;

const ALL_INPUT_REQUIRED: &str = "All input required";
const NOT_UNIQUE: &str = "Email and username must be unique";
const NO_SUCH_USER: &str = "User does not exist";

const DEFAULT_RANDOM_SIZE: usize = 5;
const MAX_RANDOM_SIZE: usize = 50;

#[derive(OpenApi)]
#[openapi(
    paths(register, login, random_users, get_user, update_user, rate_user),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        UpdateProfileRequest,
        RatingRequest,
        ProfileResponse
    ))
)]
pub struct UsersApi;

/// Routes nested under `/api/users`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/random", get(random_users))
        .route("/{user}", get(get_user).patch(update_user))
        .route("/{user}/ratings", post(rate_user))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_unique_violation())
}

fn auth_response(state: &AppState, user: &UserRecord) -> Result<AuthResponse, ServerError> {
    Ok(AuthResponse {
        token: state.tokens.issue(&user.id, user.is_admin)?,
        username: user.username.clone(),
        user_id: user.id.clone(),
        is_admin: user.is_admin,
    })
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = AuthResponse),
        (status = 400, description = "Missing input or duplicate email/username"),
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ServerError::BadRequest(ALL_INPUT_REQUIRED.to_owned()));
    };
    let email = email.to_lowercase();

    if state
        .store
        .find_user_by_email_or_username(&email, &username)
        .await?
        .is_some()
    {
        return Err(ServerError::BadRequest(NOT_UNIQUE.to_owned()));
    }

    let now = Utc::now();
    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        username,
        email,
        password_hash: hash_password(password).await?,
        is_admin: false,
        biography: non_empty(req.biography),
        business_name: non_empty(req.business_name),
        location: non_empty(req.location),
        interests: non_empty(req.interests),
        expertise: non_empty(req.expertise),
        points: 0.0,
        created_at: now,
        updated_at: now,
    };

    // Two registrations can race past the lookup above.
    match state.store.create_user(user.clone()).await {
        Err(e) if is_unique_violation(&e) => {
            return Err(ServerError::BadRequest(NOT_UNIQUE.to_owned()));
        }
        other => other?,
    }
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(auth_response(&state, &user)?))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing input or wrong credentials"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let (Some(email), Some(password)) =
        (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ServerError::BadRequest(ALL_INPUT_REQUIRED.to_owned()));
    };

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    Ok(Json(auth_response(&state, &user)?))
}

#[utoipa::path(
    get,
    path = "/api/users/random",
    tag = "users",
    params(RandomUsersQuery),
    responses(
        (
            status = 200,
            description = "Random sample of public profiles",
            body = Vec<ProfileResponse>
        ),
    )
)]
pub async fn random_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RandomUsersQuery>,
) -> Result<Json<Vec<ProfileResponse>>, ServerError> {
    let size = query.size.unwrap_or(DEFAULT_RANDOM_SIZE).min(MAX_RANDOM_SIZE);
    let users = state.store.random_users(size).await?;
    Ok(Json(users.iter().map(UserRecord::to_profile).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{user}",
    tag = "users",
    params(("user" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 400, description = "User does not exist"),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ServerError> {
    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| ServerError::BadRequest(NO_SUCH_USER.to_owned()))?;
    Ok(Json(user.to_profile()))
}

#[utoipa::path(
    patch,
    path = "/api/users/{user}",
    tag = "users",
    params(("user" = String, Path, description = "User id")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Unknown user or username taken"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the owner"),
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ServerError> {
    if claims.user_id != id && !claims.is_admin {
        return Err(ServerError::Forbidden("You can only edit your own profile".to_owned()));
    }
    let patch = ProfilePatch::from(req);
    let updated = match state.store.update_profile(&id, patch).await {
        Err(e) if is_unique_violation(&e) => {
            return Err(ServerError::BadRequest("Username already taken".to_owned()));
        }
        other => other?,
    };
    let user = updated.ok_or_else(|| ServerError::BadRequest(NO_SUCH_USER.to_owned()))?;
    info!(user_id = %user.id, by = %claims.user_id, "profile updated");
    Ok(Json(user.to_profile()))
}

#[utoipa::path(
    post,
    path = "/api/users/{user}/ratings",
    tag = "users",
    params(("user" = String, Path, description = "User id")),
    request_body = RatingRequest,
    responses(
        (status = 200, description = "Profile with new points and tier", body = ProfileResponse),
        (status = 400, description = "Invalid rating, self rating or unknown user"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer" = []))
)]
pub async fn rate_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RatingRequest>,
) -> Result<Json<ProfileResponse>, ServerError> {
    if claims.user_id == id {
        return Err(ServerError::BadRequest("You cannot rate yourself".to_owned()));
    }
    if !(req.rating > 0.0 && req.rating <= 5.0) {
        return Err(ServerError::BadRequest("Rating must be between 0 and 5".to_owned()));
    }
    let user = state
        .store
        .add_points(&id, req.rating)
        .await?
        .ok_or_else(|| ServerError::BadRequest(NO_SUCH_USER.to_owned()))?;
    info!(user_id = %user.id, rating = req.rating, tier = user.tier().level(), "rating applied");
    Ok(Json(user.to_profile()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::completion::scripted::ScriptedCompletion;

    async fn state() -> Arc<AppState> {
        AppState::for_tests(Arc::new(ScriptedCompletion::reply("unused"))).await
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some("pw".into()),
            location: Some("Accra".into()),
            ..Default::default()
        }
    }

    fn caller(user_id: &str, is_admin: bool) -> AuthUser {
        AuthUser(Claims {
            user_id: user_id.into(),
            is_admin,
            iat: 0,
            exp: 0,
        })
    }

    async fn signup(state: &Arc<AppState>, username: &str, email: &str) -> AuthResponse {
        let Json(res) = register(State(state.clone()), Json(register_req(username, email)))
            .await
            .unwrap();
        res
    }

    fn bad_request(err: ServerError) -> String {
        match err {
            ServerError::BadRequest(m) => m,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_then_login_issue_verifiable_tokens() {
        let state = state().await;
        let reg = signup(&state, "alice", "Alice@Example.com").await;
        assert_eq!(reg.username, "alice");
        assert!(!reg.is_admin);
        assert_eq!(state.tokens.verify(&reg.token).unwrap().user_id, reg.user_id);

        let Json(login_res) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("alice@example.com".into()),
                password: Some("pw".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(login_res.user_id, reg.user_id);
    }

    #[tokio::test]
    async fn register_validates_input_and_uniqueness() {
        let state = state().await;
        let err = register(State(state.clone()), Json(RegisterRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(bad_request(err), ALL_INPUT_REQUIRED);

        signup(&state, "alice", "a@example.com").await;
        let err = register(State(state.clone()), Json(register_req("alice", "b@example.com")))
            .await
            .unwrap_err();
        assert_eq!(bad_request(err), NOT_UNIQUE);
        let err = register(State(state), Json(register_req("bob", "A@example.com")))
            .await
            .unwrap_err();
        assert_eq!(bad_request(err), NOT_UNIQUE);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let state = state().await;
        signup(&state, "alice", "a@example.com").await;

        for (email, password) in [("a@example.com", "nope"), ("ghost@example.com", "pw")] {
            let err = login(
                State(state.clone()),
                Json(LoginRequest {
                    email: Some(email.into()),
                    password: Some(password.into()),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ServerError::Auth(AuthError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn profile_lookup_hides_credentials() {
        let state = state().await;
        signup(&state, "alice", "a@example.com").await;

        let Json(profile) = get_user(State(state.clone()), Path("alice".into())).await.unwrap();
        assert_eq!(profile.location.as_deref(), Some("Accra"));
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("passwordHash").is_none());

        let err = get_user(State(state), Path("ghost".into())).await.unwrap_err();
        assert_eq!(bad_request(err), NO_SUCH_USER);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_update() {
        let state = state().await;
        let alice = signup(&state, "alice", "a@example.com").await;
        let req = || UpdateProfileRequest {
            expertise: Some("irrigation".into()),
            location: Some("  ".into()),
            ..Default::default()
        };

        let err = update_user(
            State(state.clone()),
            caller("someone-else", false),
            Path(alice.user_id.clone()),
            Json(req()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let Json(updated) = update_user(
            State(state.clone()),
            caller(&alice.user_id, false),
            Path(alice.user_id.clone()),
            Json(req()),
        )
        .await
        .unwrap();
        assert_eq!(updated.expertise.as_deref(), Some("irrigation"));
        assert_eq!(updated.location.as_deref(), Some("Accra"));

        let Json(by_admin) = update_user(
            State(state),
            caller("admin", true),
            Path(alice.user_id.clone()),
            Json(req()),
        )
        .await
        .unwrap();
        assert_eq!(by_admin.id, alice.user_id);
    }

    #[tokio::test]
    async fn ratings_accumulate_into_tiers() {
        let state = state().await;
        let alice = signup(&state, "alice", "a@example.com").await;
        let rater = caller("bob", false);

        let mut last = None;
        for _ in 0..2 {
            let Json(profile) = rate_user(
                State(state.clone()),
                rater.clone(),
                Path(alice.user_id.clone()),
                Json(RatingRequest { rating: 5.0 }),
            )
            .await
            .unwrap();
            last = Some(profile);
        }
        let profile = last.unwrap();
        assert_eq!(profile.points, 10.0);
        assert_eq!(profile.tier, 1);
    }

    #[tokio::test]
    async fn invalid_ratings_are_rejected() {
        let state = state().await;
        let alice = signup(&state, "alice", "a@example.com").await;

        for rating in [0.0, -1.0, 5.5, f64::NAN] {
            let err = rate_user(
                State(state.clone()),
                caller("bob", false),
                Path(alice.user_id.clone()),
                Json(RatingRequest { rating }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ServerError::BadRequest(_)));
        }

        let err = rate_user(
            State(state),
            caller(&alice.user_id, false),
            Path(alice.user_id.clone()),
            Json(RatingRequest { rating: 3.0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(bad_request(err), "You cannot rate yourself");
    }

    #[tokio::test]
    async fn random_sample_is_capped_by_user_count() {
        let state = state().await;
        for (name, email) in [("a", "a@example.com"), ("b", "b@example.com")] {
            signup(&state, name, email).await;
        }
        let query = RandomUsersQuery { size: Some(10) };
        let Json(users) = random_users(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(users.len(), 2);

        let Json(users) = random_users(State(state), Query(RandomUsersQuery { size: Some(1) }))
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
    }
}
