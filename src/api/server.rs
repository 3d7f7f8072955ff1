use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use crate::api::routes;
use crate::daemon::Handle;

#[derive(Clone)]
pub(super) struct AppState {
    pub handle: Handle,
}

pub fn new(
    bind_addr: SocketAddr,
    timeout: Duration,
    handle: Handle,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&bind_addr)
        .serve(routes::new(AppState { handle }, timeout).into_make_service())
}
