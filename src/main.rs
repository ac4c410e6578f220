fn main() {
    cantstop_sim::cli::run();
}
