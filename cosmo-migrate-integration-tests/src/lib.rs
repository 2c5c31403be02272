//! In-process fakes of the services the migration tools talk to, served by
//! actix-web on an ephemeral local port.

use actix_web::{web, App, HttpServer};
use tokio::runtime::{Builder, Runtime};

pub mod fake_api;
pub mod fake_blob_storage;
pub mod fake_kube;
pub mod fake_token;

/// A running fake. The server stops when this is dropped.
pub struct FakeServer {
    pub base_url: String,
    _runtime: Runtime,
}

pub fn start_server<F>(configure: F) -> std::io::Result<FakeServer>
where
    F: Fn(&mut web::ServiceConfig) + Clone + Send + 'static,
{
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let (addr, server) = runtime.block_on(async move {
        let server = HttpServer::new(move || App::new().configure(configure.clone()))
            .workers(1)
            .bind(("127.0.0.1", 0))?;
        let addr = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| std::io::Error::other("server has no address"))?;
        Ok::<_, std::io::Error>((addr, server.run()))
    })?;
    runtime.spawn(async move {
        if let Err(e) = server.await {
            log::error!("fake server stopped: {}", e);
        }
    });

    Ok(FakeServer {
        base_url: format!("http://{}", addr),
        _runtime: runtime,
    })
}

/// Value of the `Authorization` header, if it is valid text.
pub(crate) fn authorization(req: &actix_web::HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
}
