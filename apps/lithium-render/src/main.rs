fn main() -> anyhow::Result<()> {
    lithium_render::internal_main()
}
