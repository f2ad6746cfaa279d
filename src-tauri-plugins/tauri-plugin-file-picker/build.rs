const COMMANDS: &[&str] = &["pick_file"];

fn main() {
  tauri_plugin::Builder::new(COMMANDS).build();
}
