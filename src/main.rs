#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    code_assistant_desktop_lib::run()
}
