//! A small server showing routes, interceptors and error handlers.

use microroute::{Flow, HttpResponse, HttpServer, Reply, RequestContext, Route, RouteMethod, ServerConfig, StatusCode};
use log::info;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct User {
    id: String,
    name: String,
    #[serde(skip)]
    #[allow(dead_code)]
    password_hash: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    // PORT and STRICT_MATCHING override the defaults
    let mut server = HttpServer::new(ServerConfig::from_env());

    server
        .get("/", |_req| async { Ok(Flow::reply("Hello, World!")) })?
        .get("/hello/:name", |req| {
            let name = req.param("name").unwrap_or("World").to_string();
            async move { Ok(Flow::reply(format!("Hello, {name}!"))) }
        })?
        .get("/echo", |req| {
            let reply = json!({
                "method": req.method.to_string(),
                "query": req.query.clone(),
                "headers": req.safe_headers.clone(),
            });
            async move { Ok(Flow::reply(reply)) }
        })?
        .post("/echo", |req| {
            let body = req.body.clone();
            async move { Ok(Flow::reply(json!({ "received": body }))) }
        })?
        .get("/users/:id", |req| {
            let user = User {
                id: req.param("id").unwrap_or_default().to_string(),
                name: "Luna".to_string(),
                password_hash: "secret".to_string(),
            };
            let flow = Flow::json(&user).map_err(anyhow::Error::from);
            async move { flow }
        })?
        .get("/google-redirect.txt", |_req| async {
            Ok(Flow::reply("google-site-verification: google-redirect.html"))
        })?
        .get("/boom", |_req| async { Err(anyhow::anyhow!("something went wrong")) })?;

    // Only requests carrying a token reach the handler; every response is timed
    let admin = Route::new(|req: &mut RequestContext| {
        let user = req.get("user").cloned();
        async move { Ok(Flow::reply(json!({ "admin": user }))) }
    })
    .before(|req: &mut RequestContext| {
        let token = req.header("authorization").map(str::to_string);
        if let Some(token) = &token {
            req.set("user", token.trim_start_matches("Bearer ").to_string());
        }
        async move {
            Ok(match token {
                Some(_) => Flow::Next,
                None => Flow::reply(HttpResponse::plain(StatusCode::Unauthorized, "Missing token")),
            })
        }
    })
    .after(|req: &mut RequestContext, error: Option<&anyhow::Error>| {
        info!("Finished {path}, error: {error:?}", path = req.path);
        async { Ok(Flow::Next) }
    });
    server.route(RouteMethod::Get, "/admin", admin)?;

    server.on_error(|req: &mut RequestContext, error: &anyhow::Error| {
        let reply = Reply::from(json!({ "path": req.path, "error": error.to_string() }));
        async move { Ok(reply) }
    });

    server.run().await?;

    Ok(())
}
