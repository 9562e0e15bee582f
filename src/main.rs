mod app;
mod core;
mod input;
mod io;
mod markdown;
mod ui;

fn main() -> anyhow::Result<()> {
    app::run()
}
