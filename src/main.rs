fn main() {
    partscan::run();
}
