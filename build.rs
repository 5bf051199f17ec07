// LadderRemote - Build Script

fn main() {
    // ESP-IDF environment setup (no-op when building for the host)
    embuild::espidf::sysenv::output();
}
