use bevy::prelude::*;
use clap::Parser;
use crawlspace::config::{Args, GameConfig};
use crawlspace::CrawlspacePlugin;

fn main() {
    let config = GameConfig::from(Args::parse());

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(ImagePlugin::default_nearest())
                .set(AssetPlugin {
                    file_path: config.assets_dir.to_string_lossy().into_owned(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Crawlspace".to_string(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(config)
        .add_plugins(CrawlspacePlugin)
        .run();
}
