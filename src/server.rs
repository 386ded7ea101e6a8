use std::io;
use std::io::ErrorKind;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use cookie::{Cookie, SameSite};
use ntex::http::HttpMessage;
use ntex::web;
use ntex::web::HttpRequest;
use ntex_files::NamedFile;
use serde::Deserialize;
use spdlog::{error, info, warn};

use crate::admin::{AdminError, AdminService, NewPost, PostUpdate};
use crate::aggregator::{aggregate, AggregateMode};
use crate::auth::{AuthClient, LocalAuthClient, RestAuthClient, Session, SessionRegistry};
use crate::category::Category;
use crate::config::{BackendKind, Config};
use crate::fetcher::DataFetcher;
use crate::post::{Post, PostId, PostKey};
use crate::query_string::{Notice, QueryString};
use crate::selector::{select, Route, Selection};
use crate::store::memory_store::MemoryTableStore;
use crate::store::rest_store::RestTableStore;
use crate::store::TableStore;
use crate::uploader::{decode_image_data, ImageUploader, ImgbbUploader};
use crate::view::admin_renderer::{AdminRenderer, AdminView};
use crate::view::category_renderer::CategoryRenderer;
use crate::view::home_renderer::HomeRenderer;
use crate::view::read_template;

const SESSION_COOKIE: &str = "disconnection_session";
const MAX_FORM_SIZE: usize = 32 * 1024 * 1024;

/// External collaborators, shared by every worker
pub struct Services {
    pub store: Arc<dyn TableStore>,
    pub uploader: Arc<dyn ImageUploader>,
    pub auth: Arc<dyn AuthClient>,
    pub upload_configured: bool,
}

impl Services {
    pub fn from_config(config: &Config) -> Services {
        let backend = &config.backend;
        let (store, auth): (Arc<dyn TableStore>, Arc<dyn AuthClient>) = match backend.kind {
            BackendKind::Rest => {
                let url = backend.url.as_deref().unwrap_or_default();
                let anon_key = backend.anon_key.as_deref().unwrap_or_default();
                (Arc::new(RestTableStore::new(url, anon_key)), Arc::new(RestAuthClient::new(url, anon_key)))
            }
            BackendKind::Memory => {
                warn!("Using the memory backend. Posts are lost on restart");
                let auth = LocalAuthClient::new(
                    backend.admin_email.as_deref().unwrap_or_default(),
                    backend.admin_password.as_deref().unwrap_or_default(),
                    Duration::seconds(config.session_ttl_secs()),
                );
                (Arc::new(MemoryTableStore::new()), Arc::new(auth))
            }
        };

        let uploader = match config.uploader {
            Some(ref up) => ImgbbUploader::new(up.api_url.as_deref(), up.api_key.as_deref()),
            None => ImgbbUploader::new(None, None),
        };
        let upload_configured = uploader.is_configured();
        if !upload_configured {
            warn!("Image host API key not set. Image uploads will fail");
        }

        Services {
            store,
            uploader: Arc::new(uploader),
            auth,
            upload_configured,
        }
    }
}

struct AppState {
    config: Config,
    services: Services,
    sessions: SessionRegistry,
}

type State = web::types::State<Arc<AppState>>;

fn html(rendered: String) -> web::HttpResponse {
    web::HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered)
}

fn redirect(location: String) -> web::HttpResponse {
    web::HttpResponse::SeeOther()
        .header("Location", location)
        .finish()
}

fn render_error(desc: &str, e: io::Error) -> web::HttpResponse {
    error!("{}: {}", desc, e);
    web::HttpResponse::InternalServerError()
        .body(format!("{}: {}", desc, e))
}

fn background(config: &Config) -> &str {
    config.site.background_url.as_deref().unwrap_or("")
}

// Begin: Gallery region --------

fn render_home(config: &Config, posts: &[Post]) -> io::Result<String> {
    let template_src = read_template(&config.paths.template_dir, "home.tpl")?;
    let renderer = HomeRenderer::new(&template_src)?;
    Ok(renderer.render(&config.site.title, background(config), posts))
}

fn render_category(config: &Config, category: Category, selection: &Selection) -> io::Result<String> {
    let template_src = read_template(&config.paths.template_dir, "category.tpl")?;
    let renderer = CategoryRenderer::new(&template_src)?;
    Ok(renderer.render(&config.site.title, background(config), category, selection))
}

#[web::get("/")]
async fn index(state: State) -> web::HttpResponse {
    let config = &state.config;
    let fetcher = DataFetcher::new(state.services.store.as_ref(), config.backend.sort_order);
    let fetches = fetcher.fetch_all(&Category::ALL).await;
    let posts = aggregate(fetches, AggregateMode::Shuffle, &mut rand::rng());

    match render_home(config, &posts) {
        Ok(rendered) => html(rendered),
        Err(e) => render_error("Error rendering gallery", e),
    }
}

async fn show_category(state: &AppState, category: &str, post_id: Option<&str>) -> web::HttpResponse {
    let route = match Route::parse(category, post_id) {
        Ok(route) => route,
        Err(e) => {
            return web::HttpResponse::NotFound()
                .body(e.to_string());
        }
    };

    let config = &state.config;
    let fetcher = DataFetcher::new(state.services.store.as_ref(), config.backend.sort_order);
    let posts = fetcher.fetch(route.category).await.into_posts();
    let selection = select(&route, &posts, config.suggestion_limit());

    let rendered = match render_category(config, route.category, &selection) {
        Ok(rendered) => rendered,
        Err(e) => return render_error("Error rendering category", e),
    };

    match selection {
        Selection::NotFound { ref post_id } => {
            info!("Post {} not found in {}", post_id, route.category);
            web::HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(rendered)
        }
        _ => html(rendered),
    }
}

#[web::get("/{category}")]
async fn category_wo_slash(path: web::types::Path<String>) -> web::HttpResponse {
    let category = path.into_inner();
    match category.parse::<Category>() {
        Ok(category) => web::HttpResponse::TemporaryRedirect()
            .header("Location", format!("/{}/", category))
            .finish(),
        Err(e) => web::HttpResponse::NotFound().body(e.to_string()),
    }
}

#[web::get("/{category}/")]
async fn category_gallery(path: web::types::Path<String>, state: State) -> web::HttpResponse {
    let category = path.into_inner();
    show_category(&state, &category, None).await
}

#[web::get("/{category}/{post_id}/")]
async fn category_post(path: web::types::Path<(String, String)>, state: State) -> web::HttpResponse {
    let (category, post_id) = path.into_inner();
    show_category(&state, &category, Some(&post_id)).await
}

#[web::get("/public/{file_name}")]
async fn public_files(path: web::types::Path<String>, state: State) -> Result<NamedFile, web::Error> {
    if path.contains("..") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = state.config.paths.public_dir.join(path.into_inner());
    Ok(NamedFile::open(file_path)?)
}

// End: Gallery region --------

// Begin: Session region --------

fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|c| c.value_trimmed().to_string())
        .filter(|token| !token.is_empty())
}

fn current_session(req: &HttpRequest, state: &AppState) -> Option<(String, Session)> {
    let token = session_token(req)?;
    let session = state.sessions.get(&token)?;
    Some((token, session))
}

fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .build()
}

fn render_login(config: &Config, email: &str, error: Option<&str>) -> io::Result<String> {
    let dir = &config.paths.template_dir;
    let admin_src = read_template(dir, "admin.tpl")?;
    let login_src = read_template(dir, "login.tpl")?;
    let renderer = AdminRenderer::new(&admin_src, &login_src)?;
    Ok(renderer.render_login(&config.site.title, email, error))
}

fn render_admin(config: &Config, view: &AdminView) -> io::Result<String> {
    let dir = &config.paths.template_dir;
    let admin_src = read_template(dir, "admin.tpl")?;
    let login_src = read_template(dir, "login.tpl")?;
    let renderer = AdminRenderer::new(&admin_src, &login_src)?;
    Ok(renderer.render_admin(&config.site.title, view))
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[web::get("/login")]
async fn login_page(req: HttpRequest, state: State) -> web::HttpResponse {
    if current_session(&req, &state).is_some() {
        return redirect("/admin".to_string());
    }

    match render_login(&state.config, "", None) {
        Ok(rendered) => html(rendered),
        Err(e) => render_error("Error rendering login", e),
    }
}

#[web::post("/login")]
async fn login(form: web::types::Form<LoginForm>, state: State) -> web::HttpResponse {
    let form = form.into_inner();
    match state.services.auth.sign_in(form.email.trim(), &form.password).await {
        Ok(session) => {
            let token = state.sessions.open(session);
            web::HttpResponse::SeeOther()
                .header("Location", "/admin")
                .cookie(session_cookie(token, state.config.session_ttl_secs()))
                .finish()
        }
        Err(e) => {
            warn!("Sign in failed for {}: {}", form.email, e);
            match render_login(&state.config, &form.email, Some(&e.to_string())) {
                Ok(rendered) => web::HttpResponse::Unauthorized()
                    .content_type("text/html; charset=utf-8")
                    .body(rendered),
                Err(e) => render_error("Error rendering login", e),
            }
        }
    }
}

#[web::post("/logout")]
async fn logout(req: HttpRequest, state: State) -> web::HttpResponse {
    if let Some(token) = session_token(&req) {
        if let Some(session) = state.sessions.close(&token) {
            if let Err(e) = state.services.auth.sign_out(&session).await {
                warn!("Sign out at the auth service failed: {}", e);
            }
        }
    }

    web::HttpResponse::SeeOther()
        .header("Location", "/")
        .cookie(session_cookie(String::new(), 0))
        .finish()
}

// End: Session region --------

// Begin: Admin region --------

fn admin_service(state: &AppState) -> AdminService<'_> {
    AdminService::new(
        state.services.store.as_ref(),
        state.services.uploader.as_ref(),
        state.config.backend.sort_order,
    )
}

fn admin_redirect(notice: Notice) -> web::HttpResponse {
    redirect(format!("/admin?{}", notice.to_query()))
}

fn write_outcome(res: Result<(), AdminError>, success: &str) -> web::HttpResponse {
    match res {
        Ok(()) => admin_redirect(Notice::Success(success.to_string())),
        Err(e) => {
            error!("Admin action failed: {}", e);
            admin_redirect(Notice::Error(format!("Error: {}", e)))
        }
    }
}

fn parse_date(buf: &str) -> Result<NaiveDate, AdminError> {
    NaiveDate::parse_from_str(buf.trim(), "%Y-%m-%d")
        .map_err(|_| AdminError::Invalid(format!("Invalid date: {}", buf)))
}

fn parse_image(image_data: Option<String>) -> Result<Option<Vec<u8>>, AdminError> {
    match image_data {
        Some(data) if !data.trim().is_empty() => Ok(Some(decode_image_data(&data)?)),
        _ => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[web::get("/admin")]
async fn admin_page(req: HttpRequest, state: State) -> web::HttpResponse {
    let Some((token, session)) = current_session(&req, &state) else {
        return redirect("/login".to_string());
    };

    if let Err(e) = state.services.auth.current_user(&session).await {
        warn!("Session rejected by the auth service: {}", e);
        state.sessions.close(&token);
        return redirect("/login".to_string());
    }

    let qs = QueryString::from(req.uri().query().unwrap_or(""));
    let filter = qs.get_manage_filter();
    let notice = qs.get_notice();
    let list = admin_service(&state).list(&filter).await;

    let view = AdminView {
        user_email: session.user.email.as_deref().unwrap_or(&session.user.id),
        notice: notice.as_ref(),
        upload_configured: state.services.upload_configured,
        today: Utc::now().date_naive(),
        filter: &filter,
        list: &list,
    };
    let rendered = render_admin(&state.config, &view);

    match rendered {
        Ok(rendered) => html(rendered),
        Err(e) => render_error("Error rendering admin", e),
    }
}

#[derive(Deserialize)]
struct CreateForm {
    title: String,
    description: Option<String>,
    category: String,
    display_date: String,
    image_data: Option<String>,
}

impl CreateForm {
    fn into_new_post(self) -> Result<NewPost, AdminError> {
        let category = self.category.parse::<Category>()
            .map_err(|e| AdminError::Invalid(e.to_string()))?;
        Ok(NewPost {
            title: self.title,
            description: self.description.unwrap_or_default(),
            category,
            display_date: parse_date(&self.display_date)?,
            image: parse_image(self.image_data)?,
        })
    }
}

#[derive(Deserialize)]
struct UpdateForm {
    title: Option<String>,
    description: Option<String>,
    display_date: Option<String>,
    image_data: Option<String>,
}

impl UpdateForm {
    fn into_update(self) -> Result<PostUpdate, AdminError> {
        let display_date = match non_empty(self.display_date) {
            Some(date) => Some(parse_date(&date)?),
            None => None,
        };
        Ok(PostUpdate {
            title: non_empty(self.title),
            description: self.description,
            display_date,
            image: parse_image(self.image_data)?,
        })
    }
}

fn post_key(category: &str, id: &str) -> Result<PostKey, AdminError> {
    let category = category.parse::<Category>()
        .map_err(|e| AdminError::Invalid(e.to_string()))?;
    Ok(PostKey { category, id: PostId::parse(id) })
}

#[web::post("/admin/posts")]
async fn create_post(req: HttpRequest, form: web::types::Form<CreateForm>, state: State) -> web::HttpResponse {
    let Some((_, session)) = current_session(&req, &state) else {
        return redirect("/login".to_string());
    };

    let res = match form.into_inner().into_new_post() {
        Ok(new_post) => admin_service(&state).create(&session, new_post).await,
        Err(e) => Err(e),
    };
    write_outcome(res, "Post added successfully!")
}

#[web::post("/admin/posts/{category}/{id}/update")]
async fn update_post(
    req: HttpRequest,
    path: web::types::Path<(String, String)>,
    form: web::types::Form<UpdateForm>,
    state: State) -> web::HttpResponse {
    let Some((_, session)) = current_session(&req, &state) else {
        return redirect("/login".to_string());
    };

    let (category, id) = path.into_inner();
    let res = match (post_key(&category, &id), form.into_inner().into_update()) {
        (Ok(key), Ok(update)) => admin_service(&state).update(&session, &key, update).await,
        (Err(e), _) | (_, Err(e)) => Err(e),
    };
    write_outcome(res, "Post updated successfully!")
}

#[web::post("/admin/posts/{category}/{id}/delete")]
async fn delete_post(req: HttpRequest, path: web::types::Path<(String, String)>, state: State) -> web::HttpResponse {
    let Some((_, session)) = current_session(&req, &state) else {
        return redirect("/login".to_string());
    };

    let (category, id) = path.into_inner();
    let res = match post_key(&category, &id) {
        Ok(key) => admin_service(&state).delete(&session, &key).await,
        Err(e) => Err(e),
    };
    write_outcome(res, "Post deleted successfully!")
}

// End: Admin region --------

pub async fn server_run(config: Config) -> io::Result<()> {
    if !config.paths.template_dir.is_dir() {
        return Err(io::Error::new(ErrorKind::NotFound, format!(
            "Template directory {} not found", config.paths.template_dir.display())));
    }

    let services = Services::from_config(&config);
    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    let sessions = SessionRegistry::new(Duration::seconds(config.session_ttl_secs()));

    let app_state = Arc::new(AppState {
        config,
        services,
        sessions,
    });

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .state(web::types::FormConfig::default().limit(MAX_FORM_SIZE))
            .service(index)
            .service(public_files)
            .service(login_page)
            .service(login)
            .service(logout)
            .service(admin_page)
            .service(create_post)
            .service(update_post)
            .service(delete_post)
            .service(category_wo_slash)
            .service(category_gallery)
            .service(category_post)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use ntex::web::test::TestRequest;

    use super::*;

    #[ntex::test]
    async fn test_session_token() {
        let req = TestRequest::with_header("cookie", "theme=dark; disconnection_session=abc-123; other=1")
            .to_http_request();
        assert_eq!(session_token(&req).as_deref(), Some("abc-123"));

        let quoted = TestRequest::with_header("cookie", "disconnection_session=\"abc\"").to_http_request();
        assert_eq!(session_token(&quoted).as_deref(), Some("abc"));

        let cleared = TestRequest::with_header("cookie", "disconnection_session=").to_http_request();
        assert_eq!(session_token(&cleared), None);
        assert_eq!(session_token(&TestRequest::default().to_http_request()), None);
    }

    #[test]
    fn test_session_cookie() {
        let built = session_cookie("t".to_string(), 60);
        assert_eq!(built.name(), SESSION_COOKIE);
        assert_eq!(built.value(), "t");
        assert_eq!(built.path(), Some("/"));
        assert_eq!(built.http_only(), Some(true));
        assert_eq!(built.same_site(), Some(SameSite::Lax));
        assert_eq!(built.max_age(), Some(cookie::time::Duration::seconds(60)));
    }

    #[test]
    fn test_create_form() {
        let form = CreateForm {
            title: "Static".to_string(),
            description: None,
            category: "animes".to_string(),
            display_date: "2025-10-16".to_string(),
            image_data: Some(String::new()),
        };
        let new_post = form.into_new_post().unwrap();
        assert_eq!(new_post.category, Category::Animes);
        assert_eq!(new_post.description, "");
        assert!(new_post.image.is_none());

        let bad = CreateForm {
            title: "x".to_string(),
            description: None,
            category: "photos".to_string(),
            display_date: "2025-10-16".to_string(),
            image_data: None,
        };
        assert!(matches!(bad.into_new_post(), Err(AdminError::Invalid(_))));
    }

    #[test]
    fn test_update_form() {
        let form = UpdateForm {
            title: Some("  ".to_string()),
            description: Some(String::new()),
            display_date: Some("2024-01-02".to_string()),
            image_data: None,
        };
        let update = form.into_update().unwrap();
        assert!(update.title.is_none());
        assert_eq!(update.description.as_deref(), Some(""));
        assert_eq!(update.display_date, NaiveDate::from_ymd_opt(2024, 1, 2));

        let bad_date = UpdateForm { title: None, description: None, display_date: Some("02/01/2024".to_string()), image_data: None };
        assert!(bad_date.into_update().is_err());
    }

    #[test]
    fn test_post_key() {
        let key = post_key("arts", "12").unwrap();
        assert_eq!(key, PostKey { category: Category::Arts, id: PostId::Int(12) });
        assert!(post_key("nope", "12").is_err());
    }
}
