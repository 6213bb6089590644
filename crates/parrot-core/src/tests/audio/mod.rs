mod capture;
mod output;
mod recording;
mod resampler;
