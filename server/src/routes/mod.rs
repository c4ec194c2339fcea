// /server/src/routes/mod.rs
use crate::{
    auth::{require_login, require_staff},
    handlers::{account_handler, admin_handler, app_handler},
    state::AppState,
};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_cookies::CookieManagerLayer;

pub fn create_router(app_state: AppState) -> Router {
    // accounts:login
    let public_routes = Router::new()
        .route("/login/", get(account_handler::login_page).post(account_handler::login))
        .route("/logout/", post(account_handler::logout));

    // app:index
    let protected_routes = Router::new()
        .route("/index/", get(app_handler::index))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_login));

    let admin_routes = Router::new()
        .route("/users", get(admin_handler::list_users).post(admin_handler::create_user))
        .route("/users/:id", get(admin_handler::get_user).patch(admin_handler::update_user))
        .route(
            "/profiles/:role",
            get(admin_handler::list_profiles).post(admin_handler::create_profile),
        )
        .route(
            "/profiles/:role/:id",
            patch(admin_handler::update_profile).delete(admin_handler::delete_profile),
        )
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_login));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/admin", admin_routes)
        .layer(CookieManagerLayer::new())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{issue_token, SESSION_COOKIE},
        config::Config,
        db::test_pool,
        models::{profile::Role, user::{RoleFlags, User}},
        store::{profiles, users},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    async fn setup() -> AppState {
        AppState { pool: test_pool().await, config: Config::for_tests() }
    }

    fn cookie_for(state: &AppState, user: &User) -> String {
        let token = issue_token(user, &state.config.jwt_secret, 1).unwrap();
        format!("{}={}", SESSION_COOKIE, token)
    }

    async fn send(state: &AppState, req: Request<Body>) -> Response {
        create_router(state.clone()).oneshot(req).await.unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers().get(header::LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn anonymous_index_redirects_to_login() {
        let state = setup().await;
        let res = send(&state, Request::get("/index/").body(Body::empty()).unwrap()).await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/login/?next=/index/");
    }

    #[tokio::test]
    async fn anonymous_redirect_keeps_encoded_query() {
        let state = setup().await;
        let req = Request::get("/admin/users?search=a&is_admin=true")
            .body(Body::empty())
            .unwrap();
        let res = send(&state, req).await;

        assert!(res.status().is_redirection());
        assert_eq!(
            location(&res),
            "/login/?next=/admin/users%3Fsearch%3Da%26is_admin%3Dtrue"
        );
    }

    #[tokio::test]
    async fn logged_in_index_says_thanks() {
        let state = setup().await;
        let user = users::make_user(&state.pool, "in@example.com", RoleFlags::default()).await;

        let req = Request::get("/index/")
            .header(header::COOKIE, cookie_for(&state, &user))
            .body(Body::empty())
            .unwrap();
        let res = send(&state, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "Thanks for login");
    }

    #[tokio::test]
    async fn bearer_token_is_accepted() {
        let state = setup().await;
        let user = users::make_user(&state.pool, "api@example.com", RoleFlags::default()).await;
        let token = issue_token(&user, &state.config.jwt_secret, 1).unwrap();

        let req = Request::get("/index/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, req).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn inactive_user_session_is_rejected() {
        let state = setup().await;
        let mut user = users::make_user(&state.pool, "off@example.com", RoleFlags::default()).await;
        let cookie = cookie_for(&state, &user);
        user.is_active = false;
        users::save_user(&state.pool, &mut user).await.unwrap();

        let req = Request::get("/index/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        assert!(send(&state, req).await.status().is_redirection());
    }

    #[tokio::test]
    async fn login_page_renders_form() {
        let state = setup().await;
        let res = send(&state, Request::get("/login/").body(Body::empty()).unwrap()).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("<form method=\"post\""));
    }

    #[tokio::test]
    async fn login_page_redirects_authenticated_user() {
        let state = setup().await;
        let user = users::make_user(&state.pool, "again@example.com", RoleFlags::default()).await;

        let req = Request::get("/login/")
            .header(header::COOKIE, cookie_for(&state, &user))
            .body(Body::empty())
            .unwrap();
        let res = send(&state, req).await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/index/");
    }

    #[tokio::test]
    async fn login_sets_cookie_and_follows_next() {
        let state = setup().await;
        users::make_user(&state.pool, "form@example.com", RoleFlags::default()).await;

        let req = Request::post("/login/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=form%40example.com&password=password&next=%2Findex%2F"))
            .unwrap();
        let res = send(&state, req).await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/index/");
        let set_cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn bad_login_rerenders_form() {
        let state = setup().await;
        users::make_user(&state.pool, "form@example.com", RoleFlags::default()).await;

        let req = Request::post("/login/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=form%40example.com&password=nope"))
            .unwrap();
        let res = send(&state, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
        assert!(body_string(res).await.contains("correct email and password"));
    }

    #[tokio::test]
    async fn admin_console_requires_staff() {
        let state = setup().await;
        let student = users::make_user(&state.pool, "kid@example.com", RoleFlags::default()).await;

        let anon = send(&state, Request::get("/admin/users").body(Body::empty()).unwrap()).await;
        assert!(anon.status().is_redirection());

        let req = Request::get("/admin/users")
            .header(header::COOKIE, cookie_for(&state, &student))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_search_users_and_delete_profiles() {
        let state = setup().await;
        let admin = users::create_superuser(&state.pool, "root@example.com", "Root", "", Some("pw"))
            .await
            .unwrap();
        let fac = users::make_user(
            &state.pool,
            "prof@uni.edu",
            RoleFlags { faculty: true, ..RoleFlags::default() },
        )
        .await;
        let cookie = cookie_for(&state, &admin);

        let req = Request::get("/admin/users?search=uni&is_student=true")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let res = send(&state, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["email"], "prof@uni.edu");
        assert!(listed[0].get("password_hash").is_none());

        let profile = profiles::find_profile_for_user(&state.pool, Role::Faculty, fac.id)
            .await
            .unwrap()
            .unwrap();
        let req = Request::delete(format!("/admin/profiles/faculty/{}", profile.id))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, req).await.status(), StatusCode::NO_CONTENT);

        let owner = users::find_by_id(&state.pool, fac.id).await.unwrap().unwrap();
        assert!(!owner.is_faculty);
    }

    #[tokio::test]
    async fn admin_create_user_checks_passwords_and_syncs() {
        let state = setup().await;
        let admin = users::create_superuser(&state.pool, "root@example.com", "Root", "", Some("pw"))
            .await
            .unwrap();
        let cookie = cookie_for(&state, &admin);

        let mismatch = Request::post("/admin/users")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"x@example.com","first_name":"X","last_name":"Y","password1":"a","password2":"b"}"#,
            ))
            .unwrap();
        assert_eq!(send(&state, mismatch).await.status(), StatusCode::BAD_REQUEST);

        let ok = Request::post("/admin/users")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"x@example.com","first_name":"X","last_name":"Y","password1":"a","password2":"a","is_faculty":true}"#,
            ))
            .unwrap();
        let res = send(&state, ok).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let created = users::find_by_email(&state.pool, "x@example.com").await.unwrap().unwrap();
        assert!(created.is_student && created.is_faculty);
        assert!(profiles::profile_exists(&state.pool, Role::Faculty, created.id).await.unwrap());
        assert!(profiles::profile_exists(&state.pool, Role::Student, created.id).await.unwrap());
    }

    #[tokio::test]
    async fn admin_updates_flags_through_sync() {
        let state = setup().await;
        let admin = users::create_superuser(&state.pool, "root@example.com", "Root", "", Some("pw"))
            .await
            .unwrap();
        let user = users::make_user(&state.pool, "up@example.com", RoleFlags::default()).await;

        let req = Request::patch(format!("/admin/users/{}", user.id))
            .header(header::COOKIE, cookie_for(&state, &admin))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"is_admin":true,"last_name":"Updated"}"#))
            .unwrap();
        let res = send(&state, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let detail = Request::get(format!("/admin/users/{}", user.id))
            .header(header::COOKIE, cookie_for(&state, &admin))
            .body(Body::empty())
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&body_string(send(&state, detail).await).await).unwrap();
        assert_eq!(body["is_admin"], true);
        assert_eq!(body["last_name"], "Updated");
        let roles: Vec<_> = body["profiles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["role"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(roles, ["admin", "student"]);
    }
}
