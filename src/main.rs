fn main() -> Result<(), Box<dyn std::error::Error>> {
    starchat::cli::main()
}
