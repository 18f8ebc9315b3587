fn main() {
    promptbridge_lib::run()
}
