use anyhow::Result;

fn main() -> Result<()> {
    dynform::ui::run()
}
