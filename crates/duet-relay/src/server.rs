//! TCP accept loop.

use tokio::net::TcpListener;

use crate::connection::{handle_connection, RelayContext};

/// Accept connections until the listener fails fatally.
pub async fn serve(listener: TcpListener, ctx: RelayContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_connection(stream, addr, ctx).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
