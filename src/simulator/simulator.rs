pub trait Simulator {
    /// Runs the simulation for one timestep
    fn step(&mut self);

    /// Runs the simulation for n timesteps
    fn step_by(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Runs the simulation until it settles or a maximum number of timesteps. Returns the number
    /// of steps if the simulation settled within the allotted number of steps, or None if it
    /// didn't.
    fn step_until_settled(&mut self, max_steps: usize) -> Option<usize>;

    /// Records the current signal levels into the trace
    fn snapshot(&mut self);

    fn show(&self);

    fn clear(&mut self);
}
