use clap::Parser;
use std::time::Duration;
use trichshot::camera::describe;
use trichshot::{find_available_cameras, preferred_camera, NoProbe, OpenCvCameras, V4l2CtlProbe};

/// Lists working cameras in preference order.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Number of device slots to probe.
    #[clap(long, default_value_t = 10)]
    max_devices: u32,

    /// Timeout for looking up a single camera name.
    #[clap(long, default_value_t = 5)]
    probe_timeout_secs: u64,

    /// Do not look up camera names with v4l2-ctl.
    #[clap(long)]
    no_probe: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();

    let source = OpenCvCameras {
        max_devices: args.max_devices,
        mirror: false,
    };
    let cameras = if args.no_probe {
        find_available_cameras(&source, &NoProbe).await
    } else {
        let probe = V4l2CtlProbe::new(Duration::from_secs(args.probe_timeout_secs));
        find_available_cameras(&source, &probe).await
    };

    println!("{}", describe(&cameras));
    match preferred_camera(&cameras) {
        Some(index) => println!("Preferred camera: {index}"),
        None => println!("Preferred camera: none"),
    }
    Ok(())
}
