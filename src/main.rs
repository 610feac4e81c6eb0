fn main() {
    if let Err(e) = screen_recorder_lib::run() {
        eprintln!("screen-recorder: {}", e);
        std::process::exit(1);
    }
}
