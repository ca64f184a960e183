//! Given steps for question-answering BDD scenarios.

use super::world::{BrokenMemory, QnaWorld, memory_worker};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a router with the question-answering workers")]
fn router_with_workers(world: &mut QnaWorld) -> Result<(), eyre::Report> {
    world
        .start(memory_worker())
        .wrap_err("start router with memory worker")
}

#[given("a router whose memory worker cannot build context")]
fn router_with_broken_memory(world: &mut QnaWorld) -> Result<(), eyre::Report> {
    let memory = BrokenMemory::new()?;
    world.start(memory).wrap_err("start router with broken memory")
}

#[given(r#"the generator will reply "{reply}""#)]
fn generator_will_reply(world: &mut QnaWorld, reply: String) {
    world.generator.push(Ok(reply));
}
