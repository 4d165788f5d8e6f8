use rigflow_api_core::Xfo;

/// Renderer collaborator fed with the visible nodes of each frame.
pub trait RenderView {
    fn begin_frame(&mut self, _epoch: u64) {}
    fn draw(&mut self, name: &str, global: &Xfo);
    fn end_frame(&mut self) {}
}

/// Collects draws; handy for tests and headless hosts.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordedView {
    pub epoch: u64,
    pub draws: Vec<(String, Xfo)>,
}

impl RenderView for RecordedView {
    fn begin_frame(&mut self, epoch: u64) {
        self.epoch = epoch;
        self.draws.clear();
    }

    fn draw(&mut self, name: &str, global: &Xfo) {
        self.draws.push((name.to_string(), *global));
    }
}
