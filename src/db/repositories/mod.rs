mod artifacts;
mod runs;
