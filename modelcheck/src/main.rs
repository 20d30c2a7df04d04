fn main() -> anyhow::Result<()> {
    modelcheck::run()
}
