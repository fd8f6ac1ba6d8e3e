/*!
The rollcall HTTP server.

```text
rollcall [ CONFIG_FILE ]
```

Database and listening settings come from the optional TOML `CONFIG_FILE`
and then from the environment (see `rollcall::config`).
*/
use std::sync::Arc;

use simplelog::{ColorChoice, TerminalMode, TermLogger};

use rollcall::config;
use rollcall::inter;

#[tokio::main]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("rollcall")
        .build();
    if let Err(e) = TermLogger::init(
        rollcall::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ) {
        eprintln!("Unable to start logging: {}", &e);
    }
    log::info!("Logging started.");

    let cfg_path = std::env::args().nth(1);
    let glob = match config::load_configuration(cfg_path.as_deref()).await {
        Ok(glob) => glob,
        Err(e) => {
            log::error!("Unable to load configuration: {}", &e);
            std::process::exit(1);
        },
    };
    let addr = glob.addr;

    let app = inter::router(Arc::new(glob));

    let server = match axum::Server::try_bind(&addr) {
        Ok(builder) => builder,
        Err(e) => {
            log::error!("Unable to bind {}: {}", &addr, &e);
            std::process::exit(1);
        },
    };
    log::info!("Listening on {}", &addr);

    if let Err(e) = server.serve(app.into_make_service()).await {
        log::error!("Server error: {}", &e);
        std::process::exit(1);
    }
}
