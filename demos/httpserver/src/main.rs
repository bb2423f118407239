//! HTTP サーバーのデモ (tokio_tcp_http11)
//!
//! 使い方:
//!   # ポート 42069 で起動
//!   cargo run -p httpserver
//!
//!   # /httpbin/ 以下を httpbin.org に中継する
//!   curl --raw http://localhost:42069/httpbin/stream/3
//!
//!   # ログを詳細にする
//!   cargo run -p httpserver -- --debug
//!   RUST_LOG=tokio_tcp_http11=trace cargo run -p httpserver

use tokio::io::AsyncWrite;
use tokio_tcp_http11::{
    Handler, HandlerError, ProxyRelay, Request, ResponseWriter, Server, StatusCode,
    default_headers,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

struct ServerOptions {
    port: u16,
    upstream: String,
    proxy_prefix: String,
    debug: bool,
}

/// ターゲットパスで返すページを切り替える
struct Pages;

impl Handler for Pages {
    async fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (status, page) = match request.target() {
            "/yourproblem" => (StatusCode::BAD_REQUEST, BAD_REQUEST_PAGE),
            "/myproblem" => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_PAGE),
            _ => (StatusCode::OK, OK_PAGE),
        };

        let mut headers = default_headers(page.len());
        headers.set("Content-Type", "text/html");
        writer.write_status_line(status).await?;
        writer.write_headers(&headers).await?;
        writer.write_body(page.as_bytes()).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args()?;
    init_tracing(options.debug);

    let relay = ProxyRelay::new(&options.upstream, &options.proxy_prefix)?;
    let server = Server::bind(&format!("0.0.0.0:{}", options.port))
        .await?
        .proxy(relay);
    let addr = server.local_addr()?;
    let handle = server.serve(Pages);

    tracing::info!(
        addr = %addr,
        upstream = %options.upstream,
        proxy_prefix = %options.proxy_prefix,
        "server started"
    );

    shutdown_signal().await?;
    handle.close();
    handle.join().await?;
    tracing::info!("server gracefully stopped");
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "httpserver=debug,tokio_tcp_http11=debug"
    } else {
        "httpserver=info,tokio_tcp_http11=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// SIGINT または SIGTERM を待つ
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutdown signal received");
    Ok(())
}

fn parse_args() -> Result<ServerOptions, Box<dyn std::error::Error>> {
    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "httpserver";

    // --help フラグ
    noargs::HELP_FLAG.take_help(&mut args);

    // --version フラグ
    let version_flag: bool = noargs::flag("version")
        .short('V')
        .doc("Show version")
        .take(&mut args)
        .is_present();
    if version_flag {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let debug: bool = noargs::flag("debug")
        .doc("Enable debug logging (overridden by RUST_LOG)")
        .take(&mut args)
        .is_present();

    let port: u16 = noargs::opt("port")
        .short('p')
        .doc("Port to listen on")
        .default("42069")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let upstream: String = noargs::opt("upstream")
        .short('u')
        .doc("Upstream base URL for proxied requests")
        .default("https://httpbin.org")
        .take(&mut args)
        .then(|o| Ok::<_, &str>(o.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    let proxy_prefix: String = noargs::opt("proxy-prefix")
        .doc("Request target prefix relayed to the upstream")
        .default("/httpbin/")
        .take(&mut args)
        .then(|o| Ok::<_, &str>(o.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    // 未知の引数があればエラー、ヘルプが返されたら表示
    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        std::process::exit(0);
    }

    Ok(ServerOptions {
        port,
        upstream,
        proxy_prefix,
        debug,
    })
}
