mod jobs_test;
